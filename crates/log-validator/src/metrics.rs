use dashmap::DashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::line::LineStatus;

pub const LINE_COUNTER_NAME: &str = "log_lines";
pub const LINE_COUNTER_HELP: &str = "A counter of log lines processed, with status";

/// Counter key: (filename, status).
pub type CounterKey = (String, LineStatus);

/// Per-file, per-outcome line counters.
///
/// Shared by every worker behind an `Arc`. Counters are created on first
/// increment and only ever go up. All operations use `Ordering::Relaxed`:
/// each counter is independent and readers only need eventual values.
#[derive(Debug, Default)]
pub struct LineMetrics {
    counters: DashMap<CounterKey, AtomicU64>,
}

impl LineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed line.
    pub fn increment(&self, filename: &str, status: LineStatus) {
        // Fast path: counter exists, only a shard read lock is taken.
        if let Some(counter) = self.counters.get(&(filename.to_string(), status)) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry((filename.to_string(), status))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Current value; zero for counters that were never incremented.
    pub fn get(&self, filename: &str, status: LineStatus) -> u64 {
        self.counters
            .get(&(filename.to_string(), status))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// All counters, sorted by filename then status.
    pub fn snapshot(&self) -> Vec<(CounterKey, u64)> {
        let mut entries: Vec<_> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Render in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# HELP {} {}", LINE_COUNTER_NAME, LINE_COUNTER_HELP);
        let _ = writeln!(out, "# TYPE {} counter", LINE_COUNTER_NAME);
        for ((filename, status), value) in self.snapshot() {
            let _ = writeln!(
                out,
                "{}{{filename=\"{}\",status=\"{}\"}} {}",
                LINE_COUNTER_NAME,
                escape_label_value(&filename),
                status,
                value
            );
        }
        out
    }

    /// Log current counters.
    pub fn print_summary(&self) {
        for ((filename, status), value) in self.snapshot() {
            tracing::info!(filename = %filename, status = %status, lines = value, "Line counter");
        }
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
