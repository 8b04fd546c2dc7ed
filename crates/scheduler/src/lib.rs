//! Pageview Scheduler Library
//!
//! Priority job queue, cancellation tokens, a bounded worker pool and the
//! prefetch window used by the page cache manager.
//!
//! Jobs are ordered by priority (the page on screen first, then prefetch
//! work by distance from it) with FIFO ordering within each level. Workers
//! never know which cache key a job belongs to; deduplication is the
//! caller's job.
//!
//! # Example
//!
//! ```
//! use pageview_render::RenderQualityTier;
//! use pageview_scheduler::{JobScheduler, JobType, PrefetchScheduler};
//!
//! let scheduler = JobScheduler::new();
//! let prefetch = PrefetchScheduler::default();
//!
//! prefetch.schedule(10, 100, |request| {
//!     scheduler.submit(
//!         request.priority(),
//!         JobType::RenderPage {
//!             page_index: request.page_index,
//!             tier: RenderQualityTier::Thumbnail,
//!         },
//!         1,
//!     );
//! });
//!
//! // The current page comes out first
//! let job = scheduler.next_job().unwrap();
//! assert_eq!(job.job_type.page_index(), 10);
//! scheduler.complete_job(job.id);
//!
//! // Navigating to another document drops the rest
//! scheduler.cancel_all();
//! assert!(!scheduler.has_pending_jobs());
//! ```

mod cancel;
mod prefetch;
mod priority;
mod scheduler;
mod worker;

pub use cancel::{CancellationRegistry, CancellationToken};
pub use prefetch::{PrefetchRequest, PrefetchScheduler, DEFAULT_PREFETCH_RADIUS};
pub use priority::{Job, JobId, JobPriority, JobType, PriorityQueue};
pub use scheduler::{JobScheduler, SchedulerStats};
pub use worker::{render_worker_count, JobExecutor, WorkerPool, WorkerPoolConfig};
