//! Page cache manager
//!
//! Turns "the user is near page N" into rendered bitmaps and text previews
//! for the pages around N, without duplicating work and without blocking the
//! caller.
//!
//! The manager belongs to one owner thread (typically the UI thread). Render
//! and extraction jobs run on worker pools and post their results to a
//! completion channel; the owner applies them with
//! [`PageCacheManager::process_completions`] or
//! [`PageCacheManager::wait_idle`]. Callbacks therefore always run on the
//! owner thread, and each one runs exactly once.
//!
//! Every document swap bumps a generation counter. Jobs carry the generation
//! they were issued under and their results are dropped if it no longer
//! matches.

use crate::config::ManagerConfig;
use crate::error::ManagerResult;
use crate::perf::{Operation, PerformanceMonitor};
use crate::pressure::MemoryPressureHandler;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use pageview_cache::{
    CacheEntry, CacheKey, CacheStats, ImageCacheStore, InFlightTracker, TextPreview,
    TextPreviewStore,
};
use pageview_render::{clip_preview, PageRenderer, PageSource, RenderQualityTier, PREVIEW_MAX_CHARS};
use pageview_scheduler::{
    CancellationToken, Job, JobExecutor, JobPriority, JobScheduler, JobType, PrefetchScheduler,
    SchedulerStats, WorkerPool,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called with the page bitmap, or `None` when there is no result (yet)
pub type SnapshotCallback = Box<dyn FnOnce(Option<CacheEntry>) + Send>;

/// Called with the page's preview text, or `None` when there is no result (yet)
pub type TextCallback = Box<dyn FnOnce(Option<TextPreview>) + Send>;

/// Result posted by a worker to the owner thread
enum Completion {
    Render {
        key: CacheKey,
        generation: u64,
        entry: Option<CacheEntry>,
    },
    Text {
        page_index: usize,
        generation: u64,
        text: String,
    },
}

struct DocumentSlot {
    generation: u64,
    source: Option<Arc<dyn PageSource>>,
}

/// State read by worker threads
struct Shared {
    document: Mutex<DocumentSlot>,
    renderer: PageRenderer,
    monitor: Option<Arc<PerformanceMonitor>>,
    completions: Sender<Completion>,
}

impl Shared {
    /// The active document, if it is still the one `generation` refers to
    fn source_for(&self, generation: u64) -> Option<Arc<dyn PageSource>> {
        let slot = self.document.lock();
        if slot.generation != generation {
            return None;
        }
        slot.source.clone()
    }

    fn timed<T>(&self, operation: Operation, f: impl FnOnce() -> T) -> T {
        match &self.monitor {
            Some(monitor) => monitor.measure(operation, f),
            None => f(),
        }
    }

    fn post(&self, completion: Completion) {
        if self.completions.send(completion).is_err() {
            tracing::trace!("completion receiver dropped");
        }
    }

    fn render(&self, job: &Job, key: CacheKey, token: &CancellationToken) -> Option<CacheEntry> {
        let Some(source) = self.source_for(job.generation) else {
            tracing::trace!(page = key.page_index, generation = job.generation, "render for replaced document skipped");
            return None;
        };
        if token.is_cancelled() {
            return None;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.timed(Operation::Render, || {
                self.renderer.render(source.as_ref(), key.page_index, key.tier)
            })
        }));
        match outcome {
            Ok(Ok(page)) => Some(CacheEntry::from(page)),
            Ok(Err(err)) => {
                tracing::debug!(page = key.page_index, tier = %key.tier, error = %err, "page render failed");
                None
            }
            Err(_) => {
                tracing::warn!(page = key.page_index, tier = %key.tier, "page source panicked during render");
                None
            }
        }
    }

    fn extract_text(&self, job: &Job, page_index: usize) -> String {
        let Some(source) = self.source_for(job.generation) else {
            return String::new();
        };

        let raw = panic::catch_unwind(AssertUnwindSafe(|| {
            self.timed(Operation::TextExtraction, || source.page_text(page_index))
        }));
        match raw {
            Ok(Some(raw)) => clip_preview(&raw, PREVIEW_MAX_CHARS),
            Ok(None) => {
                tracing::debug!(page = page_index, "no text for page");
                String::new()
            }
            Err(_) => {
                tracing::warn!(page = page_index, "page source panicked during text extraction");
                String::new()
            }
        }
    }
}

fn render_executor(shared: Arc<Shared>) -> JobExecutor {
    Arc::new(move |job: &Job, token: &CancellationToken| {
        let JobType::RenderPage { page_index, tier } = job.job_type else {
            tracing::warn!(job = job.id, job_type = ?job.job_type, "unexpected job on render pool");
            return;
        };
        let key = CacheKey::new(page_index, tier);
        let entry = shared.render(job, key, token);
        shared.post(Completion::Render {
            key,
            generation: job.generation,
            entry,
        });
    })
}

fn text_executor(shared: Arc<Shared>) -> JobExecutor {
    Arc::new(move |job: &Job, _token: &CancellationToken| {
        let JobType::ExtractText { page_index } = job.job_type else {
            tracing::warn!(job = job.id, job_type = ?job.job_type, "unexpected job on text pool");
            return;
        };
        let text = shared.extract_text(job, page_index);
        shared.post(Completion::Text {
            page_index,
            generation: job.generation,
            text,
        });
    })
}

/// Page rendering cache and prefetch scheduler for one document view.
///
/// Multiple views get independent managers; nothing is process-wide.
///
/// # Example
///
/// ```no_run
/// use pageview_core::{ManagerConfig, PageCacheManager};
/// use pageview_render::{PageSource, RenderQualityTier};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn open_document() -> Arc<dyn PageSource> { unimplemented!() }
/// let mut manager = PageCacheManager::new(ManagerConfig::default())?;
/// manager.set_document(Some(open_document()));
/// manager.set_visible_index(4);
///
/// manager.snapshot(4, RenderQualityTier::High, |entry| {
///     if let Some(entry) = entry {
///         println!("page 4 is {}x{}", entry.bitmap.width(), entry.bitmap.height());
///     }
/// });
///
/// // Called from the UI event loop
/// manager.wait_idle(Duration::from_millis(100));
/// # Ok::<(), pageview_core::ManagerError>(())
/// ```
pub struct PageCacheManager {
    shared: Arc<Shared>,
    completions: Receiver<Completion>,

    image_cache: Arc<ImageCacheStore>,
    text_cache: TextPreviewStore,
    render_inflight: InFlightTracker<CacheKey>,
    text_inflight: InFlightTracker<usize>,
    pending_snapshots: HashMap<CacheKey, SnapshotCallback>,
    pending_text: HashMap<usize, TextCallback>,

    render_scheduler: Arc<JobScheduler>,
    text_scheduler: Arc<JobScheduler>,
    render_pool: Option<WorkerPool>,
    text_pool: Option<WorkerPool>,

    prefetch: PrefetchScheduler,
    pressure: MemoryPressureHandler,
    monitor: Option<Arc<PerformanceMonitor>>,

    document: Option<Arc<dyn PageSource>>,
    page_count: usize,
    current_index: usize,
    generation: u64,
}

impl PageCacheManager {
    /// Create a manager and start its worker pools
    pub fn new(config: ManagerConfig) -> ManagerResult<Self> {
        Self::build(config, None)
    }

    /// Create a manager that times renders, extraction and document loads
    pub fn with_monitor(
        config: ManagerConfig,
        monitor: Arc<PerformanceMonitor>,
    ) -> ManagerResult<Self> {
        Self::build(config, Some(monitor))
    }

    fn build(
        config: ManagerConfig,
        monitor: Option<Arc<PerformanceMonitor>>,
    ) -> ManagerResult<Self> {
        config.validate()?;

        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared {
            document: Mutex::new(DocumentSlot {
                generation: 0,
                source: None,
            }),
            renderer: PageRenderer::new(config.baseline_width),
            monitor: monitor.clone(),
            completions: sender,
        });

        let render_scheduler = Arc::new(JobScheduler::new());
        let text_scheduler = Arc::new(JobScheduler::new());
        let render_pool = WorkerPool::new(
            render_scheduler.clone(),
            render_executor(shared.clone()),
            config.render_pool(),
        )?;
        let text_pool = WorkerPool::new(
            text_scheduler.clone(),
            text_executor(shared.clone()),
            config.text_pool(),
        )?;

        let image_cache = Arc::new(ImageCacheStore::from_config(&config.cache));
        tracing::debug!(
            render_workers = render_pool.num_workers(),
            prefetch_radius = config.prefetch_radius,
            image_cache_mb = config.cache.image_cache_mb(),
            "page cache manager started"
        );

        Ok(Self {
            shared,
            completions: receiver,
            pressure: MemoryPressureHandler::new(image_cache.clone()),
            image_cache,
            text_cache: TextPreviewStore::from_config(&config.cache),
            render_inflight: InFlightTracker::new(),
            text_inflight: InFlightTracker::new(),
            pending_snapshots: HashMap::new(),
            pending_text: HashMap::new(),
            render_scheduler,
            text_scheduler,
            render_pool: Some(render_pool),
            text_pool: Some(text_pool),
            prefetch: PrefetchScheduler::new(config.prefetch_radius),
            monitor,
            document: None,
            page_count: 0,
            current_index: 0,
            generation: 0,
        })
    }

    /// Replace the active document.
    ///
    /// Cancels all outstanding work, answers pending callbacks with `None`,
    /// clears both caches and resets the current index to 0. A document with
    /// pages then gets a prefetch pass around page 0, a `Medium` snapshot of
    /// page 0 and its text preview. `None` or an empty document just leaves
    /// the manager without content.
    pub fn set_document(&mut self, document: Option<Arc<dyn PageSource>>) {
        let timer = self.monitor.as_ref().map(|m| m.start(Operation::Load));

        self.cancel_outstanding();
        self.image_cache.clear();
        self.text_cache.clear();

        self.generation += 1;
        self.page_count = document.as_ref().map_or(0, |doc| doc.page_count());
        self.current_index = 0;
        self.document = document.clone();
        *self.shared.document.lock() = DocumentSlot {
            generation: self.generation,
            source: document,
        };

        tracing::debug!(
            generation = self.generation,
            page_count = self.page_count,
            "document replaced"
        );

        if self.page_count > 0 {
            self.schedule_prefetch();
            self.snapshot(0, RenderQualityTier::Medium, |_| {});
            self.text(0, |_| {});
        }

        if let (Some(monitor), Some(timer)) = (&self.monitor, timer) {
            monitor.finish(timer);
        }
    }

    /// Move the current page, clamping into the document, and prefetch
    /// around it. Returns the clamped index.
    ///
    /// Calling this on every scroll tick is fine: cached and in-flight pages
    /// are not submitted again.
    pub fn set_visible_index(&mut self, index: isize) -> usize {
        if index == self.current_index as isize {
            return self.current_index;
        }
        if self.page_count == 0 {
            return self.current_index;
        }

        let last = self.page_count - 1;
        self.current_index = index.clamp(0, last as isize) as usize;
        self.schedule_prefetch();
        self.current_index
    }

    fn schedule_prefetch(&mut self) {
        let window = self.prefetch.window(self.current_index, self.page_count);
        for request in window {
            self.request_snapshot(
                request.page_index,
                RenderQualityTier::Thumbnail,
                request.priority(),
                Box::new(|_| {}),
            );
        }
    }

    /// Request a page bitmap.
    ///
    /// - out of range or no document: `completion(None)` right away
    /// - cached: `completion(Some(entry))` right away
    /// - already being rendered: `completion(None)` right away, no new job
    /// - otherwise a render job is queued and `completion` runs on the owner
    ///   thread once it finishes, with `None` if the render failed
    pub fn snapshot<F>(&mut self, page_index: usize, tier: RenderQualityTier, completion: F)
    where
        F: FnOnce(Option<CacheEntry>) + Send + 'static,
    {
        let priority = self.priority_for(page_index);
        self.request_snapshot(page_index, tier, priority, Box::new(completion));
    }

    fn request_snapshot(
        &mut self,
        page_index: usize,
        tier: RenderQualityTier,
        priority: JobPriority,
        completion: SnapshotCallback,
    ) {
        if page_index >= self.page_count {
            tracing::trace!(page = page_index, page_count = self.page_count, "snapshot out of range");
            completion(None);
            return;
        }

        let key = CacheKey::new(page_index, tier);
        if let Some(entry) = self.image_cache.get(&key) {
            completion(Some(entry));
            return;
        }
        if !self.render_inflight.try_begin(key) {
            completion(None);
            return;
        }

        self.render_scheduler.submit(
            priority,
            JobType::RenderPage { page_index, tier },
            self.generation,
        );
        self.pending_snapshots.insert(key, completion);
    }

    /// Request a page's text preview. Same hit, in-flight and miss handling
    /// as [`PageCacheManager::snapshot`]; extraction runs one page at a time.
    pub fn text<F>(&mut self, page_index: usize, completion: F)
    where
        F: FnOnce(Option<TextPreview>) + Send + 'static,
    {
        if page_index >= self.page_count {
            completion(None);
            return;
        }
        if let Some(preview) = self.text_cache.get(page_index) {
            completion(Some(preview));
            return;
        }
        if !self.text_inflight.try_begin(page_index) {
            completion(None);
            return;
        }

        self.text_scheduler.submit(
            self.priority_for(page_index),
            JobType::ExtractText { page_index },
            self.generation,
        );
        self.pending_text.insert(page_index, Box::new(completion));
    }

    fn priority_for(&self, page_index: usize) -> JobPriority {
        JobPriority::for_distance(page_index.abs_diff(self.current_index))
    }

    /// Drop every cached page image. In-flight renders are not cancelled and
    /// repopulate the cache when they finish.
    pub fn clear_image_cache(&self) {
        self.image_cache.clear();
    }

    /// Drop every cached text preview
    pub fn clear_text_cache(&self) {
        self.text_cache.clear();
    }

    /// Respond to a platform memory warning by dropping page images
    pub fn handle_memory_pressure(&self) {
        self.pressure.evict();
    }

    /// Handler that can be moved to a platform notification thread
    pub fn memory_pressure_handler(&self) -> MemoryPressureHandler {
        self.pressure.clone()
    }

    /// Apply every finished job without blocking. Returns how many were applied.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Apply finished jobs until nothing is in flight or `timeout` elapses.
    ///
    /// Returns `true` if the manager went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_completions();
            if self.is_idle() {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.completions.recv_timeout(remaining) {
                Ok(completion) => self.apply(completion),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return self.is_idle();
                }
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Render {
                key,
                generation,
                entry,
            } => {
                if generation != self.generation {
                    tracing::trace!(page = key.page_index, tier = %key.tier, generation, "stale render discarded");
                    return;
                }
                self.render_inflight.finish(&key);
                if let Some(entry) = &entry {
                    self.image_cache.insert(key, entry.clone());
                }
                if let Some(callback) = self.pending_snapshots.remove(&key) {
                    callback(entry);
                }
            }
            Completion::Text {
                page_index,
                generation,
                text,
            } => {
                if generation != self.generation {
                    tracing::trace!(page = page_index, generation, "stale text discarded");
                    return;
                }
                self.text_inflight.finish(&page_index);
                let preview = TextPreview::new(page_index, text);
                self.text_cache.insert(preview.clone());
                if let Some(callback) = self.pending_text.remove(&page_index) {
                    callback(Some(preview));
                }
            }
        }
    }

    /// Whether no render or extraction is outstanding
    pub fn is_idle(&self) -> bool {
        self.render_inflight.is_empty() && self.text_inflight.is_empty()
    }

    fn cancel_outstanding(&mut self) {
        self.render_scheduler.cancel_all();
        self.text_scheduler.cancel_all();
        self.render_inflight.clear();
        self.text_inflight.clear();

        for (_, callback) in self.pending_snapshots.drain() {
            callback(None);
        }
        for (_, callback) in self.pending_text.drain() {
            callback(None);
        }
    }

    /// Cancel all work, answer pending callbacks with `None` and join the
    /// worker threads
    pub fn shutdown(mut self) {
        self.cancel_outstanding();
        for pool in [self.render_pool.take(), self.text_pool.take()].into_iter().flatten() {
            pool.shutdown();
        }
        tracing::debug!("page cache manager shut down");
    }

    /// Page the view is on
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Pages in the active document, 0 without one
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// The active document
    pub fn document(&self) -> Option<&Arc<dyn PageSource>> {
        self.document.as_ref()
    }

    /// Current document generation; bumped by every [`PageCacheManager::set_document`]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached bitmap for a key, without requesting a render
    pub fn cached_snapshot(&self, page_index: usize, tier: RenderQualityTier) -> Option<CacheEntry> {
        self.image_cache.get(&CacheKey::new(page_index, tier))
    }

    /// Cached text previews by page index
    pub fn text_previews(&self) -> BTreeMap<usize, String> {
        self.text_cache.snapshot()
    }

    pub fn image_cache_stats(&self) -> CacheStats {
        self.image_cache.stats()
    }

    /// Shared page image store
    pub fn image_cache(&self) -> &Arc<ImageCacheStore> {
        &self.image_cache
    }

    /// Render and text requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.render_inflight.len() + self.text_inflight.len()
    }

    /// Render scheduler counters; `jobs_submitted` counts render jobs issued
    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.render_scheduler.stats()
    }

    /// Text extraction scheduler counters
    pub fn text_scheduler_stats(&self) -> SchedulerStats {
        self.text_scheduler.stats()
    }

    /// Render pool size
    pub fn render_workers(&self) -> usize {
        self.render_pool.as_ref().map_or(0, WorkerPool::num_workers)
    }

    pub fn performance_monitor(&self) -> Option<&Arc<PerformanceMonitor>> {
        self.monitor.as_ref()
    }
}

impl Drop for PageCacheManager {
    fn drop(&mut self) {
        // Pools left here signal their workers on drop without joining
        self.cancel_outstanding();
    }
}
