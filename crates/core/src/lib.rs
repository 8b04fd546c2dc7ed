//! Pageview Core Library
//!
//! The page cache manager: renders pages at quality tiers on demand, caches
//! the bitmaps and text previews, prefetches the pages around the one on
//! screen and sheds images under memory pressure.
//!
//! Built on the render, cache and scheduler crates. The manager is an owned
//! value; each document view creates its own.

pub mod config;
pub mod error;
pub mod manager;
pub mod perf;
pub mod pressure;

pub use config::ManagerConfig;
pub use error::{ManagerError, ManagerResult};
pub use manager::{PageCacheManager, SnapshotCallback, TextCallback};
pub use perf::{Operation, OperationStats, OperationTimer, PerformanceMonitor};
pub use pressure::MemoryPressureHandler;

pub use pageview_cache::{CacheConfig, CacheEntry, CacheKey, CacheStats, MemoryPressure, TextPreview};
pub use pageview_render::{PageSource, RenderQualityTier};
