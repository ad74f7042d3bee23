use std::sync::Arc;
use tracing::{debug, error};

use crate::line::{validate_line, LineStatus};
use crate::metrics::LineMetrics;
use crate::tail::{LineResult, Lines};

/// Validates every line one tailer produces.
pub struct Worker {
    filename: String,
    metrics: Arc<LineMetrics>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub ok: u64,
    pub bad: u64,
    pub io_errors: u64,
}

impl Worker {
    pub fn new(filename: impl Into<String>, metrics: Arc<LineMetrics>) -> Self {
        Self {
            filename: filename.into(),
            metrics,
        }
    }

    /// Consume lines until the tailer closes the channel.
    pub async fn run(self, mut lines: Lines) -> WorkerSummary {
        let mut summary = WorkerSummary::default();
        while let Some(item) = lines.recv().await {
            self.handle(item, &mut summary);
        }
        debug!(filename = %self.filename, ok = summary.ok, bad = summary.bad, "Worker finished");
        summary
    }

    /// Blank lines are validated too and end up counted as bad. Batch mode
    /// skips them instead; both behaviours are intentional for now.
    fn handle(&self, item: LineResult, summary: &mut WorkerSummary) {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                summary.io_errors += 1;
                error!(filename = %self.filename, "error while tailing {}: {}", self.filename, e);
                return;
            }
        };

        match validate_line(&line) {
            Ok(()) => {
                summary.ok += 1;
                self.metrics.increment(&self.filename, LineStatus::Ok);
            }
            Err(e) => {
                summary.bad += 1;
                self.metrics.increment(&self.filename, LineStatus::Bad);
                error!(
                    filename = %self.filename,
                    "{}: {} {:?}",
                    self.filename,
                    e,
                    String::from_utf8_lossy(&line)
                );
            }
        }
    }
}
