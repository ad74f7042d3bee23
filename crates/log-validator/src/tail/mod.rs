//! Tail module — follow a growing file and yield appended lines.
//!
//! One [`TailHandle`] per file. The tailer runs as its own tokio task,
//! survives rotation, truncation and a file that does not exist yet, and
//! delivers lines in file order over a bounded channel.

pub mod error;
pub mod logger;
pub mod state;
pub mod tailer;

pub use error::TailError;
pub use logger::{TailLogger, TracingTailLogger};
pub use state::TailState;
pub use tailer::{LineResult, Lines, TailConfig, TailHandle};
