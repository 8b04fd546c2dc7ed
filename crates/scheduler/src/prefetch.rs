//! Prefetch window ordering
//!
//! Turns "the user is on page N" into the list of neighbouring pages to warm,
//! nearest first. Ties between the page before and the page after the
//! current one go to the lower index.

use crate::priority::JobPriority;

/// Default number of pages prefetched on each side of the current page
pub const DEFAULT_PREFETCH_RADIUS: usize = 3;

/// One page to prefetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub page_index: usize,

    /// Pages between this one and the current page
    pub distance: usize,
}

impl PrefetchRequest {
    /// Queue priority for this request
    pub fn priority(&self) -> JobPriority {
        JobPriority::for_distance(self.distance)
    }
}

/// Computes the prefetch window around the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchScheduler {
    radius: usize,
}

impl PrefetchScheduler {
    /// Window of `radius` pages on each side of the current page
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Pages in `[current - radius, current + radius]`, clamped to the
    /// document, ordered nearest first.
    ///
    /// An empty document yields an empty window. A `current` past the end is
    /// clamped to the last page.
    pub fn window(&self, current: usize, page_count: usize) -> Vec<PrefetchRequest> {
        if page_count == 0 {
            return Vec::new();
        }
        let current = current.min(page_count - 1);

        let mut requests = Vec::with_capacity(self.radius * 2 + 1);
        requests.push(PrefetchRequest {
            page_index: current,
            distance: 0,
        });
        for distance in 1..=self.radius {
            if let Some(before) = current.checked_sub(distance) {
                requests.push(PrefetchRequest {
                    page_index: before,
                    distance,
                });
            }
            let after = current + distance;
            if after < page_count {
                requests.push(PrefetchRequest {
                    page_index: after,
                    distance,
                });
            }
        }
        requests
    }

    /// Page indices of [`PrefetchScheduler::window`], in order
    pub fn window_indices(&self, current: usize, page_count: usize) -> Vec<usize> {
        self.window(current, page_count)
            .into_iter()
            .map(|request| request.page_index)
            .collect()
    }

    /// Call `submit` once per page in the window, nearest first.
    ///
    /// Returns the number of requests issued.
    pub fn schedule<F>(&self, current: usize, page_count: usize, mut submit: F) -> usize
    where
        F: FnMut(PrefetchRequest),
    {
        let window = self.window(current, page_count);
        let issued = window.len();
        for request in window {
            submit(request);
        }
        tracing::trace!(current, page_count, issued, "prefetch pass");
        issued
    }
}

impl Default for PrefetchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_RADIUS)
    }
}
