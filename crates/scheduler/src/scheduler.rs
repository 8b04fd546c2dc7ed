//! Job scheduler
//!
//! Thread-safe front of the priority queue. Owners submit jobs; workers
//! block in [`JobScheduler::wait_for_job`] until one is available.

use crate::cancel::{CancellationRegistry, CancellationToken};
use crate::priority::{Job, JobId, JobPriority, JobType, PriorityQueue};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Job scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,

    /// Jobs removed from the queue before they ran
    pub jobs_cancelled: u64,

    /// Jobs currently queued
    pub queue_size: usize,
}

impl SchedulerStats {
    /// Jobs submitted but neither completed nor cancelled
    /// Jobs waiting in the queue
    pub fn pending_jobs(&self) -> u64 {
        self.jobs_submitted - self.jobs_completed - self.jobs_cancelled
    }
}

struct SchedulerState {
    queue: PriorityQueue,
    stats: SchedulerStats,
    closed: bool,
}

/// Priority job scheduler with cancellation tokens.
///
/// # Example
///
/// ```
/// use pageview_render::RenderQualityTier;
/// use pageview_scheduler::{JobPriority, JobScheduler, JobType};
///
/// let scheduler = JobScheduler::new();
/// let (job_id, token) = scheduler.submit(
///     JobPriority::Visible,
///     JobType::RenderPage { page_index: 0, tier: RenderQualityTier::Medium },
///     1,
/// );
///
/// if let Some(job) = scheduler.next_job() {
///     assert_eq!(job.id, job_id);
///     assert!(!token.is_cancelled());
///     scheduler.complete_job(job.id);
/// }
/// ```
pub struct JobScheduler {
    state: Mutex<SchedulerState>,
    available: Condvar,
    cancellation: CancellationRegistry,
}

impl JobScheduler {
    /// Empty, open scheduler
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                queue: PriorityQueue::new(),
                stats: SchedulerStats::default(),
                closed: false,
            }),
            available: Condvar::new(),
            cancellation: CancellationRegistry::new(),
        }
    }

    /// Queue a job and wake one waiting worker.
    ///
    /// Returns the job id and its cancellation token.
    pub fn submit(
        &self,
        priority: JobPriority,
        job_type: JobType,
        generation: u64,
    ) -> (JobId, CancellationToken) {
        let mut state = self.state.lock();
        let job_id = state.queue.push(priority, job_type, generation);
        // Registered under the queue lock so a worker never sees an untracked job
        let token = self.cancellation.register(job_id);
        state.stats.jobs_submitted += 1;
        drop(state);

        self.available.notify_one();
        (job_id, token)
    }

    /// Pop the most urgent job without waiting
    pub fn next_job(&self) -> Option<Job> {
        self.state.lock().queue.pop()
    }

    /// Pop the most urgent job, waiting up to `timeout` for one to arrive
    pub fn wait_for_job(&self, timeout: Duration) -> Option<Job> {
        let mut state = self.state.lock();
        if state.queue.is_empty() && !state.closed {
            self.available.wait_for(&mut state, timeout);
        }
        state.queue.pop()
    }

    /// Stop waiting in [`JobScheduler::wait_for_job`] and wake every waiter.
    ///
    /// Set under the queue lock so a worker about to wait cannot miss it.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Whether [`JobScheduler::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Token for a queued or running job
    pub fn cancellation_token(&self, job_id: JobId) -> Option<CancellationToken> {
        self.cancellation.get(job_id)
    }

    /// Mark a job finished, whether it ran to completion or bailed out
    pub fn complete_job(&self, job_id: JobId) {
        self.state.lock().stats.jobs_completed += 1;
        self.cancellation.unregister(job_id);
    }

    /// Cancel every queued and running job. Returns the queued jobs removed.
    pub fn cancel_all(&self) -> Vec<Job> {
        let mut state = self.state.lock();
        let removed = state.queue.drain();
        state.stats.jobs_cancelled += removed.len() as u64;
        self.cancellation.cancel_all();
        drop(state);

        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "cancelled queued jobs");
        }
        removed
    }

    pub fn pending_jobs(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.state.lock().queue.is_empty()
    }

    /// Counters plus the current queue size
    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        SchedulerStats {
            queue_size: state.queue.len(),
            ..state.stats
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageview_render::RenderQualityTier;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn render(page_index: usize) -> JobType {
        JobType::RenderPage {
            page_index,
            tier: RenderQualityTier::Thumbnail,
        }
    }

    #[test]
    fn test_submit_and_complete() {
        let scheduler = JobScheduler::new();
        let (job_id, token) = scheduler.submit(JobPriority::Visible, render(0), 3);

        let job = scheduler.next_job().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.generation, 3);
        assert!(!token.is_cancelled());
        assert!(scheduler.cancellation_token(job_id).is_some());

        scheduler.complete_job(job_id);
        assert!(scheduler.cancellation_token(job_id).is_none());

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_submitted, 1);
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.pending_jobs(), 0);
    }

    #[test]
    fn test_cancel_all() {
        let scheduler = JobScheduler::new();
        let (_, running_token) = scheduler.submit(JobPriority::Visible, render(0), 1);
        let _running = scheduler.next_job().unwrap();
        for page in 1..4 {
            scheduler.submit(JobPriority::Prefetch(page), render(page), 1);
        }

        let removed = scheduler.cancel_all();
        assert_eq!(removed.len(), 3);
        assert!(running_token.is_cancelled());
        assert_eq!(scheduler.pending_jobs(), 0);

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_cancelled, 3);
        assert_eq!(stats.pending_jobs(), 1);
    }

    #[test]
    fn test_wait_for_job_times_out() {
        let scheduler = JobScheduler::new();
        let start = Instant::now();
        assert!(scheduler.wait_for_job(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_closed_scheduler_does_not_wait() {
        let scheduler = JobScheduler::new();
        scheduler.close();
        assert!(scheduler.is_closed());

        let start = Instant::now();
        assert!(scheduler.wait_for_job(Duration::from_secs(10)).is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_for_job_wakes_on_submit() {
        let scheduler = Arc::new(JobScheduler::new());
        let waiter = {
            let scheduler = scheduler.clone();
            thread::spawn(move || scheduler.wait_for_job(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        scheduler.submit(JobPriority::Visible, render(4), 1);

        let job = waiter.join().unwrap().expect("worker should receive the job");
        assert_eq!(job.job_type.page_index(), 4);
    }
}
