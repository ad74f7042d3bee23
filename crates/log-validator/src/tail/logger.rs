//! Logger — the logging capability the tailer needs, bridged onto tracing.
//!
//! The tailer only ever reports three kinds of things: progress (`info`),
//! recoverable trouble (`error`) and conditions it cannot continue from
//! (`fatal`). Fatal is logged, never turned into a process abort.

use std::fmt;

pub trait TailLogger: Send + Sync {
    fn info(&self, msg: fmt::Arguments<'_>);
    fn error(&self, msg: fmt::Arguments<'_>);
    fn fatal(&self, msg: fmt::Arguments<'_>);
}

/// Forwards tailer messages to the process-wide tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTailLogger;

impl TailLogger for TracingTailLogger {
    fn info(&self, msg: fmt::Arguments<'_>) {
        tracing::info!(target: "log_validator::tail", "{}", msg);
    }

    fn error(&self, msg: fmt::Arguments<'_>) {
        tracing::error!(target: "log_validator::tail", "{}", msg);
    }

    fn fatal(&self, msg: fmt::Arguments<'_>) {
        tracing::error!(target: "log_validator::tail", fatal = true, "{}", msg);
    }
}
