//! Error — crate-level error type for startup and batch failures.
//!
//! Per-line problems (`LineError`) and tailer problems (`TailError`) have
//! their own types; this one is what crosses module boundaries on the way
//! to `main`.

use std::path::PathBuf;
use thiserror::Error;

use crate::tail::TailError;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to tail {}: {source}", path.display())]
    Watcher {
        path: PathBuf,
        #[source]
        source: TailError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file contained {count} invalid line(s)")]
    InvalidLines { count: usize },

    #[error("Debug server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

impl From<toml::de::Error> for ValidatorError {
    fn from(err: toml::de::Error) -> Self {
        ValidatorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ValidatorError {
    fn from(err: serde_json::Error) -> Self {
        ValidatorError::Config(err.to_string())
    }
}
