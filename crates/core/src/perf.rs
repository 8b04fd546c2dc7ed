//! Performance monitor
//!
//! Records how long document loads, searches, renders and text extraction
//! take. A disabled monitor records nothing, so it can stay attached in
//! release builds.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Timed operation identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Installing a document in the manager
    Load,
    Search,
    /// Rendering one page bitmap
    Render,
    /// Extracting one page's preview text
    TextExtraction,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Load,
        Operation::Search,
        Operation::Render,
        Operation::TextExtraction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Load => "Document Load",
            Operation::Search => "Search",
            Operation::Render => "Page Render",
            Operation::TextExtraction => "Text Extraction",
        }
    }
}

/// Summary of every recorded run of one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl OperationStats {
    /// Mean duration per run, zero when nothing was recorded
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }
}

/// A started measurement, closed with [`PerformanceMonitor::finish`]
#[derive(Debug)]
#[must_use = "pass the timer to PerformanceMonitor::finish"]
pub struct OperationTimer {
    operation: Operation,
    started: Instant,
}

impl OperationTimer {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Thread-safe operation timer shared between the manager and its workers
#[derive(Debug)]
pub struct PerformanceMonitor {
    enabled: AtomicBool,
    stats: Mutex<HashMap<Operation, OperationStats>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    /// Create an enabled monitor
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        let monitor = Self::new();
        monitor.set_enabled(false);
        monitor
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn start(&self, operation: Operation) -> OperationTimer {
        OperationTimer {
            operation,
            started: Instant::now(),
        }
    }

    /// Close a measurement and return its duration
    pub fn finish(&self, timer: OperationTimer) -> Duration {
        let elapsed = timer.elapsed();
        self.record(timer.operation, elapsed);
        elapsed
    }

    /// Run `f` and record how long it took
    pub fn measure<T>(&self, operation: Operation, f: impl FnOnce() -> T) -> T {
        let timer = self.start(operation);
        let result = f();
        self.finish(timer);
        result
    }

    pub fn record(&self, operation: Operation, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        self.stats.lock().entry(operation).or_default().record(elapsed);
        tracing::trace!(
            operation = operation.name(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "operation timed"
        );
    }

    pub fn stats(&self, operation: Operation) -> Option<OperationStats> {
        self.stats.lock().get(&operation).copied()
    }

    pub fn reset(&self) {
        self.stats.lock().clear();
    }

    /// Human-readable summary of every operation recorded so far
    pub fn report(&self) -> String {
        let stats = self.stats.lock();
        let mut out = String::from("=== PERFORMANCE SUMMARY ===\n");

        for operation in Operation::ALL {
            if let Some(s) = stats.get(&operation) {
                let _ = writeln!(
                    out,
                    "  {:20} {:>6} runs  avg {:>8.2}ms  max {:>8.2}ms  total {:>9.2}ms",
                    operation.name(),
                    s.count,
                    s.average().as_secs_f64() * 1000.0,
                    s.max.as_secs_f64() * 1000.0,
                    s.total.as_secs_f64() * 1000.0
                );
            }
        }

        out.push_str("===========================\n");
        out
    }
}
