//! Job priorities and the job priority queue
//!
//! Explicit requests for the page on screen run first. Prefetch work is
//! ordered by its distance from the current page at submission time, nearest
//! first, and FIFO among equal distances.

use pageview_render::RenderQualityTier;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Unique job identifier
pub type JobId = u64;

/// Job priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPriority {
    /// Background work, carrying the distance (in pages) from the current page
    Prefetch(usize),

    /// Explicit request for the page being displayed
    Visible,
}

impl JobPriority {
    /// Priority for a request at `distance` pages from the current page
    pub fn for_distance(distance: usize) -> Self {
        if distance == 0 {
            JobPriority::Visible
        } else {
            JobPriority::Prefetch(distance)
        }
    }
}

impl Ord for JobPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (JobPriority::Visible, JobPriority::Visible) => Ordering::Equal,
            (JobPriority::Visible, JobPriority::Prefetch(_)) => Ordering::Greater,
            (JobPriority::Prefetch(_), JobPriority::Visible) => Ordering::Less,
            // Nearer pages are more urgent
            (JobPriority::Prefetch(a), JobPriority::Prefetch(b)) => b.cmp(a),
        }
    }
}

impl PartialOrd for JobPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What a job does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    /// Render a page bitmap at a quality tier
    RenderPage {
        page_index: usize,
        tier: RenderQualityTier,
    },

    /// Extract and clip a page's preview text
    ExtractText { page_index: usize },
}

impl JobType {
    pub fn page_index(&self) -> usize {
        match self {
            JobType::RenderPage { page_index, .. } | JobType::ExtractText { page_index } => {
                *page_index
            }
        }
    }
}

/// A queued job
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub priority: JobPriority,
    pub job_type: JobType,

    /// Document generation the job was issued under
    pub generation: u64,

    insertion_order: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        priority: JobPriority,
        job_type: JobType,
        generation: u64,
        insertion_order: u64,
    ) -> Self {
        Self {
            id,
            priority,
            job_type,
            generation,
            insertion_order,
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap: earlier insertion must compare greater
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}

/// Max-heap of jobs with id and insertion-order bookkeeping.
///
/// Not synchronized; [`crate::JobScheduler`] owns it behind its lock.
#[derive(Debug)]
pub struct PriorityQueue {
    heap: BinaryHeap<Job>,
    next_job_id: JobId,
    insertion_counter: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_job_id: 1,
            insertion_counter: 0,
        }
    }

    /// Queue a job and return its assigned id
    pub fn push(&mut self, priority: JobPriority, job_type: JobType, generation: u64) -> JobId {
        let id = self.next_job_id;
        self.next_job_id += 1;
        let order = self.insertion_counter;
        self.insertion_counter += 1;

        self.heap
            .push(Job::new(id, priority, job_type, generation, order));
        id
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&Job> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove and return every queued job
    pub fn drain(&mut self) -> Vec<Job> {
        self.heap.drain().collect()
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(page_index: usize) -> JobType {
        JobType::RenderPage {
            page_index,
            tier: RenderQualityTier::Thumbnail,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(JobPriority::Visible > JobPriority::Prefetch(1));
        assert!(JobPriority::Prefetch(1) > JobPriority::Prefetch(2));
        assert_eq!(JobPriority::for_distance(0), JobPriority::Visible);
        assert_eq!(JobPriority::for_distance(3), JobPriority::Prefetch(3));
    }

    #[test]
    fn test_queue_pops_visible_then_nearest() {
        let mut queue = PriorityQueue::new();
        queue.push(JobPriority::Prefetch(3), render(13), 1);
        queue.push(JobPriority::Prefetch(1), render(11), 1);
        queue.push(JobPriority::Visible, render(10), 1);
        queue.push(JobPriority::Prefetch(2), render(8), 1);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|job| job.job_type.page_index())
            .collect();
        assert_eq!(order, vec![10, 11, 8, 13]);
    }

    #[test]
    fn test_fifo_within_same_priority() {
        let mut queue = PriorityQueue::new();
        let first = queue.push(JobPriority::Prefetch(1), render(9), 1);
        let second = queue.push(JobPriority::Prefetch(1), render(11), 1);

        assert_eq!(queue.peek().map(|job| job.id), Some(first));
        assert_eq!(queue.pop().unwrap().id, first);
        assert_eq!(queue.pop().unwrap().id, second);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let mut queue = PriorityQueue::new();
        let a = queue.push(JobPriority::Visible, render(0), 1);
        let b = queue.push(JobPriority::Visible, JobType::ExtractText { page_index: 0 }, 1);
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = PriorityQueue::new();
        for page in 0..5 {
            queue.push(JobPriority::Prefetch(page + 1), render(page), 1);
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 5);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }
}
