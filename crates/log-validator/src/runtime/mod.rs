//! Runtime module — everything between `main` and the library proper.
//!
//! - `boot.rs`: tracing setup, config loading, batch entry point
//! - `stop.rs`: termination signal handling
//! - `debug.rs`: `/metrics` and `/health` router
//! - `serve.rs`: service mode lifecycle

pub mod boot;
pub mod debug;
pub mod serve;
pub mod stop;
