//! Manager configuration
//!
//! Prefetch radius, render resolution and worker settings, plus the cache
//! limits from [`CacheConfig`]. Loaded from defaults, a JSON file or
//! `PAGEVIEW_*` environment variables.

use pageview_cache::{env_override, CacheConfig, ConfigError};
use pageview_render::DEFAULT_BASELINE_WIDTH;
use pageview_scheduler::{WorkerPoolConfig, DEFAULT_PREFETCH_RADIUS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for [`crate::PageCacheManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pages prefetched on each side of the current page
    pub prefetch_radius: usize,

    /// Pixel width of a `Medium` render; other tiers scale from it
    pub baseline_width: u32,

    /// Render worker count; `None` sizes the pool from the machine
    pub render_workers: Option<usize>,

    /// How often idle workers recheck for shutdown
    pub poll_interval_ms: u64,

    pub cache: CacheConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            baseline_width: DEFAULT_BASELINE_WIDTH,
            render_workers: None,
            poll_interval_ms: 50,
            cache: CacheConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Sets the prefetch radius
    pub fn with_prefetch_radius(mut self, radius: usize) -> Self {
        self.prefetch_radius = radius;
        self
    }

    pub fn with_baseline_width(mut self, width: u32) -> Self {
        self.baseline_width = width;
        self
    }

    /// Fixes the render pool size
    pub fn with_render_workers(mut self, workers: usize) -> Self {
        self.render_workers = Some(workers);
        self
    }

    /// Sets the poll interval, rounded up to whole milliseconds
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_micros().div_ceil(1000)).unwrap_or(u64::MAX);
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Render pool configuration derived from this config
    pub fn render_pool(&self) -> WorkerPoolConfig {
        let pool = match self.render_workers {
            Some(workers) => WorkerPoolConfig::new(workers).with_name("pageview-render"),
            None => WorkerPoolConfig::for_rendering(),
        };
        pool.with_poll_interval(self.poll_interval())
    }

    /// Text extraction pool configuration (always one worker)
    pub fn text_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::serial().with_poll_interval(self.poll_interval())
    }

    /// Reject values the manager cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline_width == 0 {
            return Err(ConfigError::InvalidValue("baseline_width".to_string()));
        }
        if self.render_workers == Some(0) {
            return Err(ConfigError::InvalidValue("render_workers".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("poll_interval_ms".to_string()));
        }
        Ok(())
    }

    /// Loads configuration from environment variables.
    ///
    /// - `PAGEVIEW_PREFETCH_RADIUS`: pages on each side (default: 3)
    /// - `PAGEVIEW_BASELINE_WIDTH`: medium-tier width in pixels (default: 1024)
    /// - `PAGEVIEW_RENDER_WORKERS`: render thread count (default: cores - 2, at least 2)
    /// - `PAGEVIEW_POLL_INTERVAL_MS`: idle worker poll interval (default: 50)
    ///
    /// Cache limits come from the `PAGEVIEW_*_CACHE_*` variables read by
    /// [`CacheConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overrides fields from environment variables that are set
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(radius) = env_override("PAGEVIEW_PREFETCH_RADIUS")? {
            self.prefetch_radius = radius;
        }
        if let Some(width) = env_override("PAGEVIEW_BASELINE_WIDTH")? {
            self.baseline_width = width;
        }
        if let Some(workers) = env_override("PAGEVIEW_RENDER_WORKERS")? {
            self.render_workers = Some(workers);
        }
        if let Some(interval) = env_override("PAGEVIEW_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = interval;
        }
        self.cache = self.cache.apply_env()?;
        Ok(self)
    }

    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
