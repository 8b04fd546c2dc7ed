//! Pageview Cache Library
//!
//! Page image cache, text preview cache and in-flight tracking used by the
//! page cache manager. The stores are thread-safe so render workers can read
//! and write them concurrently.

pub mod config;
pub mod inflight;
pub mod key;
pub mod memory_budget;
pub mod ram;
pub mod text;

pub use config::{env_override, CacheConfig, ConfigError};
pub use inflight::InFlightTracker;
pub use key::{CacheEntry, CacheKey, TextPreview};
pub use memory_budget::MemoryPressure;
pub use ram::{CacheStats, ImageCacheStore};
pub use text::TextPreviewStore;
