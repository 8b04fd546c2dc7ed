//! Cache configuration
//!
//! Limits for the page image store and the text preview store. Configuration
//! can be created programmatically, loaded from a JSON file, or overridden
//! from environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

const MB: usize = 1024 * 1024;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration key
    #[error("invalid value for configuration key {0}")]
    InvalidValue(String),
    /// I/O error reading or writing a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed configuration file
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read an environment variable and parse it, if set
pub fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

/// Configuration for the page caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte budget for cached page images
    pub image_cache_bytes: usize,
    /// Maximum number of cached page images
    pub image_cache_entries: usize,
    /// Maximum number of cached text previews
    pub text_cache_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_cache_bytes: 256 * MB,
            image_cache_entries: 512,
            text_cache_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Sets the image byte budget in megabytes, saturating at `usize::MAX` bytes.
    pub fn with_image_mb(mut self, mb: usize) -> Self {
        self.image_cache_bytes = mb.saturating_mul(MB);
        self
    }

    /// Sets the image entry cap
    pub fn with_image_entries(mut self, entries: usize) -> Self {
        self.image_cache_entries = entries;
        self
    }

    /// Sets the text preview cap
    pub fn with_text_entries(mut self, entries: usize) -> Self {
        self.text_cache_entries = entries;
        self
    }

    /// Image byte budget in whole megabytes
    pub fn image_cache_mb(&self) -> usize {
        self.image_cache_bytes / MB
    }

    /// Loads configuration from environment variables.
    ///
    /// - `PAGEVIEW_IMAGE_CACHE_MB`: image byte budget in MB (default: 256)
    /// - `PAGEVIEW_IMAGE_CACHE_ENTRIES`: image entry cap (default: 512)
    /// - `PAGEVIEW_TEXT_CACHE_ENTRIES`: text preview cap (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overrides fields from environment variables that are set.
    ///
    /// A megabyte count too large to express in bytes is rejected.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(mb) = env_override::<usize>("PAGEVIEW_IMAGE_CACHE_MB")? {
            self.image_cache_bytes = mb
                .checked_mul(MB)
                .ok_or_else(|| ConfigError::InvalidValue("PAGEVIEW_IMAGE_CACHE_MB".to_string()))?;
        }
        if let Some(entries) = env_override("PAGEVIEW_IMAGE_CACHE_ENTRIES")? {
            self.image_cache_entries = entries;
        }
        if let Some(entries) = env_override("PAGEVIEW_TEXT_CACHE_ENTRIES")? {
            self.text_cache_entries = entries;
        }
        Ok(self)
    }

    /// Loads configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        env::remove_var("PAGEVIEW_IMAGE_CACHE_MB");
        env::remove_var("PAGEVIEW_IMAGE_CACHE_ENTRIES");
        env::remove_var("PAGEVIEW_TEXT_CACHE_ENTRIES");
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.image_cache_bytes, 256 * MB);
        assert_eq!(config.image_cache_entries, 512);
        assert_eq!(config.text_cache_entries, 10_000);
    }

    #[test]
    fn test_builder_methods() {
        let config = CacheConfig::default()
            .with_image_mb(64)
            .with_image_entries(32)
            .with_text_entries(100);

        assert_eq!(config.image_cache_mb(), 64);
        assert_eq!(config.image_cache_entries, 32);
        assert_eq!(config.text_cache_entries, 100);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("PAGEVIEW_IMAGE_CACHE_MB", "128");
        env::set_var("PAGEVIEW_TEXT_CACHE_ENTRIES", " 50 ");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.image_cache_mb(), 128);
        assert_eq!(config.image_cache_entries, 512);
        assert_eq!(config.text_cache_entries, 50);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        clear_env();
        env::set_var("PAGEVIEW_IMAGE_CACHE_ENTRIES", "lots");

        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "PAGEVIEW_IMAGE_CACHE_ENTRIES"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_byte_overflow() {
        clear_env();
        env::set_var("PAGEVIEW_IMAGE_CACHE_MB", usize::MAX.to_string());

        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "PAGEVIEW_IMAGE_CACHE_MB"));

        // Largest megabyte count that still fits
        env::set_var("PAGEVIEW_IMAGE_CACHE_MB", (usize::MAX / MB).to_string());
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.image_cache_mb(), usize::MAX / MB);

        clear_env();
    }

    #[test]
    fn test_image_mb_builder_saturates() {
        let config = CacheConfig::default().with_image_mb(usize::MAX);
        assert_eq!(config.image_cache_bytes, usize::MAX);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let config = CacheConfig::default().with_image_mb(32);
        config.save_to_file(&path).unwrap();
        assert_eq!(CacheConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{ "image_cache_entries": 8 }"#).unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config.image_cache_entries, 8);
        assert_eq!(config.image_cache_bytes, 256 * MB);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CacheConfig::from_file(dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, "image_cache_entries = 8").unwrap();
        assert!(matches!(CacheConfig::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
