//! Per-page text preview store
//!
//! Maps page index to clipped preview text. Independent of the image store:
//! clearing one never touches the other.

use crate::config::CacheConfig;
use crate::key::TextPreview;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Capacity-bounded LRU of page text previews
pub struct TextPreviewStore {
    entries: Mutex<LruCache<usize, String>>,
    capacity: usize,
}

impl TextPreviewStore {
    /// Create a store holding at most `capacity` pages (zero disables it)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity,
        }
    }

    /// Create a store sized by `text_cache_entries`
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.text_cache_entries)
    }

    /// Cached preview for a page, marking it most recently used
    pub fn get(&self, page_index: usize) -> Option<TextPreview> {
        self.entries
            .lock()
            .get(&page_index)
            .map(|text| TextPreview::new(page_index, text.clone()))
    }

    /// Check for a preview without touching recency
    pub fn contains(&self, page_index: usize) -> bool {
        self.entries.lock().contains(&page_index)
    }

    /// Store a preview, evicting the least recently used page when full
    pub fn insert(&self, preview: TextPreview) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        entries.put(preview.page_index, preview.text);
        while entries.len() > self.capacity {
            entries.pop_lru();
        }
    }

    /// Drop every preview
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered copy of every cached preview
    pub fn snapshot(&self) -> BTreeMap<usize, String> {
        self.entries
            .lock()
            .iter()
            .map(|(page, text)| (*page, text.clone()))
            .collect()
    }
}

impl Default for TextPreviewStore {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
