use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tail::TailConfig;

/// Service-mode configuration. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorConfig {
    /// How this process logs.
    #[serde(default, alias = "Syslog", alias = "logging")]
    pub syslog: LoggingConfig,

    /// Listen address for `/metrics` and `/health`. Empty disables it.
    #[serde(default, rename = "debugAddr", alias = "DebugAddr", alias = "debug_addr")]
    pub debug_addr: String,

    /// Files to monitor. Required.
    #[serde(alias = "Files")]
    pub files: Vec<PathBuf>,

    #[serde(default)]
    pub tail: TailSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File { path: String },
}

/// Tailer tuning knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TailSettings {
    pub poll_interval_ms: u64,
    pub channel_capacity: usize,
    pub stop_timeout_ms: u64,
}

impl Default for TailSettings {
    fn default() -> Self {
        let defaults = TailConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            channel_capacity: defaults.channel_capacity,
            stop_timeout_ms: defaults.stop_timeout.as_millis() as u64,
        }
    }
}

impl TailSettings {
    pub fn to_tail_config(&self) -> TailConfig {
        TailConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            channel_capacity: self.channel_capacity,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}
