//! In-memory page image cache with LRU eviction
//!
//! Holds rendered page bitmaps keyed by (page, tier). The store is bounded
//! both by entry count and by total bitmap bytes; inserting past either
//! bound evicts least recently used entries first.

use crate::config::CacheConfig;
use crate::key::{CacheEntry, CacheKey};
use crate::memory_budget::MemoryPressure;
use lru::LruCache;
use parking_lot::Mutex;

/// Statistics about image cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries currently cached
    pub entry_count: usize,

    /// Maximum number of entries allowed
    pub entry_limit: usize,

    /// Total bitmap bytes currently cached
    pub memory_used: usize,

    /// Maximum bitmap bytes allowed
    pub memory_limit: usize,

    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,

    /// Entries evicted to stay within limits
    pub evictions: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Byte budget utilization (0.0 to 1.0)
    pub fn memory_utilization(&self) -> f64 {
        if self.memory_limit == 0 {
            0.0
        } else {
            self.memory_used as f64 / self.memory_limit as f64
        }
    }
}

struct StoreState {
    /// Recency order is tracked by the LRU itself; limits are enforced here
    entries: LruCache<CacheKey, CacheEntry>,
    stats: CacheStats,
}

impl StoreState {
    fn over_limits(&self, incoming_bytes: usize, incoming_entries: usize) -> bool {
        self.stats.memory_used + incoming_bytes > self.stats.memory_limit
            || self.entries.len() + incoming_entries > self.stats.entry_limit
    }

    fn evict_to_fit(&mut self, incoming_bytes: usize, incoming_entries: usize) {
        while self.over_limits(incoming_bytes, incoming_entries) {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.stats.memory_used = self.stats.memory_used.saturating_sub(entry.memory_size());
            self.stats.evictions += 1;
            tracing::trace!(page = key.page_index, tier = %key.tier, "evicted page image");
        }
        self.stats.entry_count = self.entries.len();
    }

    fn detach(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.stats.memory_used = self.stats.memory_used.saturating_sub(entry.memory_size());
        self.stats.entry_count = self.entries.len();
        Some(entry)
    }
}

/// Thread-safe page image store.
///
/// Render workers and the owning manager may call into it concurrently; each
/// call takes the internal lock once, so individual operations are atomic.
///
/// # Example
///
/// ```
/// use pageview_cache::{CacheEntry, CacheKey, ImageCacheStore};
/// use pageview_render::{PageBitmap, PageSize, RenderQualityTier};
///
/// let store = ImageCacheStore::new(64, 16 * 1024 * 1024);
/// let key = CacheKey::new(0, RenderQualityTier::Thumbnail);
/// let bitmap = PageBitmap::new(image::RgbaImage::new(30, 40));
///
/// store.insert(key, CacheEntry::new(bitmap, PageSize::new(612.0, 792.0)));
/// assert!(store.get(&key).is_some());
/// ```
pub struct ImageCacheStore {
    state: Mutex<StoreState>,
}

impl ImageCacheStore {
    /// Create a store bounded by `max_entries` entries and `memory_limit` bytes
    pub fn new(max_entries: usize, memory_limit: usize) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: LruCache::unbounded(),
                stats: CacheStats {
                    entry_limit: max_entries,
                    memory_limit,
                    ..Default::default()
                },
            }),
        }
    }

    /// Create a store sized by `image_cache_entries` and `image_cache_bytes`
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.image_cache_entries, config.image_cache_bytes)
    }

    /// Look up an entry, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut state = self.state.lock();
        let found = state.entries.get(key).cloned();
        match found {
            Some(entry) => {
                state.stats.hits += 1;
                Some(entry)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Check for an entry without touching recency or statistics
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Store an entry, replacing any previous entry for the key.
    ///
    /// Returns `false` if the entry alone exceeds the byte budget or the
    /// store has no entry capacity; such entries are not stored.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) -> bool {
        let size = entry.memory_size();
        let mut state = self.state.lock();

        if size > state.stats.memory_limit || state.stats.entry_limit == 0 {
            tracing::debug!(
                page = key.page_index,
                tier = %key.tier,
                bytes = size,
                limit = state.stats.memory_limit,
                "page image larger than cache budget, not cached"
            );
            return false;
        }

        state.detach(&key);
        state.evict_to_fit(size, 1);
        state.entries.put(key, entry);
        state.stats.memory_used += size;
        state.stats.entry_count = state.entries.len();
        state.stats.insertions += 1;
        true
    }

    /// Remove and return an entry
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.state.lock().detach(key)
    }

    /// Drop every entry. Statistics counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.stats.entry_count = 0;
        state.stats.memory_used = 0;
    }

    /// Current usage and counters
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bitmap bytes currently cached
    pub fn memory_used(&self) -> usize {
        self.state.lock().stats.memory_used
    }

    /// Change the byte budget, evicting immediately if now over it
    pub fn set_memory_limit(&self, memory_limit: usize) {
        let mut state = self.state.lock();
        state.stats.memory_limit = memory_limit;
        state.evict_to_fit(0, 0);
    }

    /// Pressure level derived from byte budget utilization
    pub fn pressure(&self) -> MemoryPressure {
        MemoryPressure::from_utilization(self.stats().memory_utilization())
    }
}

impl Default for ImageCacheStore {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageview_render::{PageBitmap, PageSize, RenderQualityTier};
    use rand::Rng;
    use std::sync::Arc;
    use std::thread;

    /// 100x100 RGBA bitmap, 40_000 bytes
    const ENTRY_BYTES: usize = 100 * 100 * 4;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            PageBitmap::new(image::RgbaImage::new(100, 100)),
            PageSize::new(612.0, 792.0),
        )
    }

    fn key(page: usize) -> CacheKey {
        CacheKey::thumbnail(page)
    }

    #[test]
    fn test_basic_insert_get() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        let stored = entry();
        assert!(store.insert(key(1), stored.clone()));

        let found = store.get(&key(1)).expect("entry should be cached");
        assert!(found.same_bitmap(&stored));
        assert_eq!(found.logical_size, PageSize::new(612.0, 792.0));
    }

    #[test]
    fn test_tiers_are_distinct_keys() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        store.insert(key(1), entry());

        assert!(store.get(&CacheKey::new(1, RenderQualityTier::Medium)).is_none());
        assert!(store.get(&key(1)).is_some());
    }

    #[test]
    fn test_cache_miss_counts() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        assert!(store.get(&key(999)).is_none());

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_byte_budget_eviction() {
        let store = ImageCacheStore::new(100, ENTRY_BYTES * 2);
        store.insert(key(1), entry());
        store.insert(key(2), entry());
        store.insert(key(3), entry()); // Should evict page 1

        assert!(!store.contains(&key(1)));
        assert!(store.contains(&key(2)));
        assert!(store.contains(&key(3)));
        assert_eq!(store.stats().evictions, 1);
        assert_eq!(store.memory_used(), ENTRY_BYTES * 2);
    }

    #[test]
    fn test_entry_count_eviction() {
        let store = ImageCacheStore::new(2, usize::MAX);
        store.insert(key(1), entry());
        store.insert(key(2), entry());
        store.insert(key(3), entry());

        assert_eq!(store.len(), 2);
        assert!(!store.contains(&key(1)));
    }

    #[test]
    fn test_lru_ordering() {
        let store = ImageCacheStore::new(2, usize::MAX);
        store.insert(key(1), entry());
        store.insert(key(2), entry());

        // Touch page 1 so page 2 becomes least recently used
        assert!(store.get(&key(1)).is_some());
        store.insert(key(3), entry());

        assert!(store.contains(&key(1)));
        assert!(!store.contains(&key(2)));
        assert!(store.contains(&key(3)));
    }

    #[test]
    fn test_replace_is_full_replace() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        let first = entry();
        let second = entry();
        store.insert(key(1), first.clone());
        store.insert(key(1), second.clone());

        let found = store.get(&key(1)).unwrap();
        assert!(found.same_bitmap(&second));
        assert!(!found.same_bitmap(&first));
        assert_eq!(store.len(), 1);
        assert_eq!(store.memory_used(), ENTRY_BYTES);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let store = ImageCacheStore::new(8, ENTRY_BYTES - 1);
        assert!(!store.insert(key(1), entry()));
        assert!(store.is_empty());
        assert_eq!(store.stats().insertions, 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        store.insert(key(1), entry());
        store.insert(key(2), entry());

        assert!(store.remove(&key(1)).is_some());
        assert!(store.remove(&key(1)).is_none());
        assert_eq!(store.memory_used(), ENTRY_BYTES);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.memory_used(), 0);
        assert_eq!(store.stats().insertions, 2);
    }

    #[test]
    fn test_set_memory_limit_shrinks() {
        let store = ImageCacheStore::new(8, 1024 * 1024);
        for page in 0..4 {
            store.insert(key(page), entry());
        }

        store.set_memory_limit(ENTRY_BYTES);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&key(3)));
        assert_eq!(store.stats().evictions, 3);
    }

    #[test]
    fn test_stats_and_pressure() {
        let store = ImageCacheStore::new(8, ENTRY_BYTES * 4);
        assert_eq!(store.pressure(), MemoryPressure::Low);

        for page in 0..4 {
            store.insert(key(page), entry());
        }
        let _ = store.get(&key(0));
        let _ = store.get(&key(99));

        let stats = store.stats();
        assert_eq!(stats.entry_count, 4);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!((stats.memory_utilization() - 1.0).abs() < f64::EPSILON);
        assert_eq!(store.pressure(), MemoryPressure::Critical);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(ImageCacheStore::new(16, ENTRY_BYTES * 16));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..200 {
                        let page = rng.gen_range(0..32);
                        if rng.gen_bool(0.5) {
                            store.insert(key(page), entry());
                        } else {
                            let _ = store.get(&key(page));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = store.stats();
        assert!(stats.entry_count <= 16);
        assert_eq!(stats.memory_used, stats.entry_count * ENTRY_BYTES);
    }
}
