//! Service module — continuous monitoring of the configured files.
//!
//! - `worker.rs`: per-file consumer that validates and counts lines
//! - `supervisor.rs`: owns every tailer/worker pair and coordinates shutdown
//! - `status.rs`: read-only view of tailer states for the health endpoint

pub mod status;
pub mod supervisor;
pub mod worker;

pub use status::{FileStatus, StatusBoard};
pub use supervisor::{ShutdownReport, Supervisor};
pub use worker::{Worker, WorkerSummary};
