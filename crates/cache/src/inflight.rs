//! In-flight request tracking
//!
//! A set of keys whose render or extraction job has been submitted but has
//! not completed yet. Callers use [`InFlightTracker::try_begin`] as an atomic
//! check-and-insert so at most one job per key exists at a time.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;

/// Thread-safe set of in-flight keys
pub struct InFlightTracker<K> {
    keys: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash> InFlightTracker<K> {
    /// Empty tracker
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
        }
    }

    /// Mark `key` as in flight.
    ///
    /// Returns `false` if it already was, in which case the caller must not
    /// submit another job for it.
    pub fn try_begin(&self, key: K) -> bool {
        self.keys.lock().insert(key)
    }

    /// Clear the in-flight mark. Returns `true` if the key was marked.
    pub fn finish(&self, key: &K) -> bool {
        self.keys.lock().remove(key)
    }

    /// Whether a job for `key` is outstanding
    pub fn contains(&self, key: &K) -> bool {
        self.keys.lock().contains(key)
    }

    /// Forget every mark, e.g. after cancelling all jobs
    pub fn clear(&self) {
        self.keys.lock().clear();
    }

    /// Number of outstanding keys
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

impl<K: Eq + Hash> Default for InFlightTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
