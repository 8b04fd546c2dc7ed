//! Memory pressure handling
//!
//! Reacts to platform memory warnings by dropping page images. Text previews
//! and in-flight tracking are left alone; renders that finish afterwards
//! repopulate the image cache.

use crossbeam_channel::Receiver;
use pageview_cache::{ImageCacheStore, MemoryPressure};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Clears the image cache when memory runs short.
///
/// Cheap to clone; every clone targets the same store.
#[derive(Clone)]
pub struct MemoryPressureHandler {
    images: Arc<ImageCacheStore>,
}

impl MemoryPressureHandler {
    pub fn new(images: Arc<ImageCacheStore>) -> Self {
        Self { images }
    }

    /// Handle a pressure signal. Returns `true` if the image cache was cleared.
    ///
    /// `Low` and `Moderate` are ignored.
    pub fn notify(&self, level: MemoryPressure) -> bool {
        if !level.needs_eviction() {
            tracing::trace!(%level, "memory pressure below eviction threshold");
            return false;
        }
        self.clear_images(level);
        true
    }

    /// Clear the image cache unconditionally
    pub fn evict(&self) {
        self.clear_images(MemoryPressure::Critical);
    }

    fn clear_images(&self, level: MemoryPressure) {
        let stats = self.images.stats();
        self.images.clear();
        tracing::debug!(
            %level,
            entries = stats.entry_count,
            bytes = stats.memory_used,
            "memory pressure: cleared page images"
        );
    }

    /// Handle signals from `signals` on a background thread.
    ///
    /// The thread exits once every sender is dropped.
    pub fn spawn_listener(&self, signals: Receiver<MemoryPressure>) -> io::Result<JoinHandle<()>> {
        let handler = self.clone();
        thread::Builder::new()
            .name("pageview-memory-pressure".to_string())
            .spawn(move || {
                for level in signals {
                    handler.notify(level);
                }
                tracing::trace!("memory pressure listener stopped");
            })
    }
}
