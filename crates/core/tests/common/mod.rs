//! Shared fixtures for manager integration tests

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use pageview_core::{ManagerConfig, PageCacheManager};
use pageview_render::{PageSize, PageSource, PageTransform, PixelSize, RenderResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Show manager logs when tests run with `RUST_LOG` set
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(render_workers: usize) -> ManagerConfig {
    ManagerConfig::default()
        .with_baseline_width(48)
        .with_render_workers(render_workers)
        .with_poll_interval(Duration::from_millis(10))
}

pub fn manager(render_workers: usize) -> PageCacheManager {
    init_tracing();
    PageCacheManager::new(config(render_workers)).unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Scripted document: fixed page count, solid-colour pages, optional broken
/// pages and gates that hold renders or text extraction until opened.
pub struct ScriptedSource {
    count: usize,
    color: Rgba<u8>,
    zero_bounds: HashSet<usize>,
    no_text: HashSet<usize>,
    panics: HashSet<usize>,
    open: AtomicBool,
    started: AtomicUsize,
    finished: AtomicUsize,
    rendered: Mutex<Vec<usize>>,
    text_open: AtomicBool,
    text_started: AtomicUsize,
    text_finished: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            color: BLUE,
            zero_bounds: HashSet::new(),
            no_text: HashSet::new(),
            panics: HashSet::new(),
            open: AtomicBool::new(true),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
            text_open: AtomicBool::new(true),
            text_started: AtomicUsize::new(0),
            text_finished: AtomicUsize::new(0),
        }
    }

    pub fn with_color(mut self, color: Rgba<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn with_zero_bounds(mut self, page: usize) -> Self {
        self.zero_bounds.insert(page);
        self
    }

    pub fn without_text(mut self, page: usize) -> Self {
        self.no_text.insert(page);
        self
    }

    pub fn panicking_on(mut self, page: usize) -> Self {
        self.panics.insert(page);
        self
    }

    /// Start with the gate closed; renders block until [`ScriptedSource::open`]
    pub fn gated(self) -> Self {
        self.open.store(false, Ordering::SeqCst);
        self
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Start with the text gate closed; extraction blocks until
    /// [`ScriptedSource::open_text`]
    pub fn gated_text(self) -> Self {
        self.text_open.store(false, Ordering::SeqCst);
        self
    }

    pub fn open_text(&self) {
        self.text_open.store(true, Ordering::SeqCst);
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Renders that have entered the source
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Renders that have left the source
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Text extractions that have entered the source
    pub fn text_started(&self) -> usize {
        self.text_started.load(Ordering::SeqCst)
    }

    /// Text extractions that have left the source
    pub fn text_finished(&self) -> usize {
        self.text_finished.load(Ordering::SeqCst)
    }

    /// Page indices in the order they were rendered
    pub fn rendered(&self) -> Vec<usize> {
        self.rendered.lock().clone()
    }

    pub fn reset_log(&self) {
        self.rendered.lock().clear();
    }

    fn paint(&self, index: usize, width: u32, height: u32) -> RgbaImage {
        self.started.fetch_add(1, Ordering::SeqCst);
        wait_until(IDLE_TIMEOUT, || self.open.load(Ordering::SeqCst));
        if self.panics.contains(&index) {
            self.finished.fetch_add(1, Ordering::SeqCst);
            panic!("scripted render failure on page {index}");
        }
        self.rendered.lock().push(index);
        self.finished.fetch_add(1, Ordering::SeqCst);
        RgbaImage::from_pixel(width, height, self.color)
    }
}

impl PageSource for ScriptedSource {
    fn page_count(&self) -> usize {
        self.count
    }

    fn page_bounds(&self, index: usize) -> Option<PageSize> {
        if index >= self.count {
            return None;
        }
        if self.zero_bounds.contains(&index) {
            return Some(PageSize::new(0.0, 792.0));
        }
        Some(PageSize::new(612.0, 792.0))
    }

    fn draw_page(
        &self,
        index: usize,
        target: &mut RgbaImage,
        _transform: &PageTransform,
    ) -> RenderResult<()> {
        *target = self.paint(index, target.width(), target.height());
        Ok(())
    }

    fn fast_thumbnail(&self, index: usize, target: PixelSize) -> Option<RgbaImage> {
        Some(self.paint(index, target.width, target.height))
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.text_started.fetch_add(1, Ordering::SeqCst);
        wait_until(IDLE_TIMEOUT, || self.text_open.load(Ordering::SeqCst));
        self.text_finished.fetch_add(1, Ordering::SeqCst);
        if self.panics.contains(&index) {
            panic!("scripted text failure on page {index}");
        }
        if self.no_text.contains(&index) {
            return None;
        }
        Some(format!("Page {index}   body\n\n\ttext"))
    }
}

pub fn document(source: &Arc<ScriptedSource>) -> Option<Arc<dyn PageSource>> {
    let source: Arc<dyn PageSource> = source.clone();
    Some(source)
}

/// Collects every value a callback is invoked with
#[derive(Clone)]
pub struct Recorder<T> {
    calls: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> impl FnOnce(T) + Send + 'static {
        let calls = self.calls.clone();
        move |value| calls.lock().push(value)
    }

    pub fn calls(&self) -> Vec<T> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }
}
