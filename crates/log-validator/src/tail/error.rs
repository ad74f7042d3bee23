use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TailError {
    /// The tailer cannot start at all. Surfaced synchronously by `spawn`.
    #[error("invalid tail configuration: {0}")]
    InvalidConfig(String),

    /// A transient read/stat failure, delivered in-band.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stop landed while the tailer was reopening a rotated file.
    #[error("stopped while reopening {}", path.display())]
    ReopenInterrupted { path: PathBuf },

    #[error("tailer for {} did not stop within {timeout:?}", path.display())]
    StopTimeout { path: PathBuf, timeout: Duration },

    #[error("tailer task for {} failed: {reason}", path.display())]
    Task { path: PathBuf, reason: String },
}

impl TailError {
    /// True for the stop/reopen race, which is harmless during shutdown.
    pub fn is_shutdown_race(&self) -> bool {
        matches!(self, TailError::ReopenInterrupted { .. })
    }
}
