//! Cooperative cancellation for render and extraction jobs
//!
//! Cancellation is all-or-nothing: a document swap drops every queued job
//! and flips the token of every running one. Running jobs may stop early; if
//! they do not, their result is still discarded by the owner's staleness
//! check.

use crate::priority::JobId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tokens for every job that is queued or running
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<JobId, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a token for `job_id`
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().insert(job_id, token.clone());
        token
    }

    /// Cancel and forget every registered job. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let mut tokens = self.tokens.lock();
        let count = tokens.len();
        for (_, token) in tokens.drain() {
            token.cancel();
        }
        count
    }

    /// Forget a finished job. Returns `true` if it was registered.
    pub fn unregister(&self, job_id: JobId) -> bool {
        self.tokens.lock().remove(&job_id).is_some()
    }

    /// Token for a registered job
    pub fn get(&self, job_id: JobId) -> Option<CancellationToken> {
        self.tokens.lock().get(&job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}
