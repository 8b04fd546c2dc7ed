//! Manager errors
//!
//! Only construction can fail. Once running, every render or extraction
//! failure resolves to "no result" for the caller.

use pageview_cache::ConfigError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
