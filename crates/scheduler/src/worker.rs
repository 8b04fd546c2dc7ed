//! Bounded worker pool
//!
//! A fixed set of threads pulls jobs from a [`JobScheduler`] and hands each
//! one to a shared executor. The thread count is the concurrency bound; the
//! pool knows nothing about cache keys or documents.

use crate::{CancellationToken, Job, JobScheduler};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Runs one job. Executors should poll `token` during long work.
pub type JobExecutor = Arc<dyn Fn(&Job, &CancellationToken) + Send + Sync>;

/// Threads kept free for the UI when sizing the render pool
const UI_HEADROOM_THREADS: usize = 2;

/// Minimum render pool size
const MIN_RENDER_WORKERS: usize = 2;

/// Configuration for a worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub num_workers: usize,

    /// Longest a worker waits for a job before rechecking for shutdown
    pub poll_interval: Duration,

    /// Thread name prefix
    pub name: String,
}

impl WorkerPoolConfig {
    /// Pool of `num_workers` threads with default polling and naming
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            poll_interval: Duration::from_millis(50),
            name: "pageview-worker".to_string(),
        }
    }

    /// Render pool: `max(2, available_parallelism - 2)` workers
    pub fn for_rendering() -> Self {
        Self::new(render_worker_count(available_parallelism())).with_name("pageview-render")
    }

    /// Single-worker pool, used for serialized text extraction
    pub fn serial() -> Self {
        Self::new(1).with_name("pageview-text")
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::for_rendering()
    }
}

/// Render worker count for a machine with `cores` logical cores
pub fn render_worker_count(cores: usize) -> usize {
    cores.saturating_sub(UI_HEADROOM_THREADS).max(MIN_RENDER_WORKERS)
}

fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Pool of worker threads executing jobs from one scheduler.
///
/// Dropping the pool signals shutdown without waiting; call
/// [`WorkerPool::shutdown`] to join the threads.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    scheduler: Arc<JobScheduler>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn `config.num_workers` threads
    pub fn new(
        scheduler: Arc<JobScheduler>,
        executor: JobExecutor,
        config: WorkerPoolConfig,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut pool = Self {
            workers: Vec::with_capacity(config.num_workers),
            scheduler: scheduler.clone(),
            shutdown: shutdown.clone(),
        };

        for id in 0..config.num_workers {
            let scheduler = scheduler.clone();
            let executor = executor.clone();
            let shutdown = shutdown.clone();
            let poll_interval = config.poll_interval;

            // On spawn failure `pool` drops here and stops the threads already started
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.name, id))
                .spawn(move || run_worker(scheduler, executor, shutdown, poll_interval))?;
            pool.workers.push(handle);
        }

        tracing::debug!(workers = config.num_workers, name = %config.name, "worker pool started");
        Ok(pool)
    }

    /// Threads spawned by this pool
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop the workers and wait for their current jobs to finish
    pub fn shutdown(mut self) {
        self.signal_shutdown();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
    }

    fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.scheduler.close();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

fn run_worker(
    scheduler: Arc<JobScheduler>,
    executor: JobExecutor,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        let Some(job) = scheduler.wait_for_job(poll_interval) else {
            continue;
        };

        // A missing token means the job was cancelled between pop and here
        match scheduler.cancellation_token(job.id) {
            Some(token) if !token.is_cancelled() => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor(&job, &token)));
                if outcome.is_err() {
                    tracing::warn!(job = job.id, job_type = ?job.job_type, "job executor panicked");
                }
            }
            _ => tracing::trace!(job = job.id, "skipping cancelled job"),
        }

        scheduler.complete_job(job.id);
    }
}
