use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::batch;
use crate::conf::{LogFormat, LogOutput, ValidatorConfig};
use crate::metrics::LineMetrics;

/// Phase 1: basic thread-local tracing so config loading can log.
/// Uses RUST_LOG or a sensible default.
pub fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,log_validator=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: global subscriber built from the config's logging section.
pub fn init_tracing_from_config(config: &ValidatorConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logging = &config.syslog;
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match (&logging.format, &logging.output) {
        (LogFormat::Json, LogOutput::Stdout) => {
            let layer = fmt::layer().json().with_target(true).with_thread_ids(true);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        (LogFormat::Json, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        (LogFormat::Pretty, LogOutput::Stdout) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        (LogFormat::Pretty, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }
    Ok(())
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path))
}

/// Global stderr subscriber for batch mode, where stdout stays clean.
pub fn init_logging_basic_global() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load and validate the config, then switch tracing over to it.
pub fn boot(config_path: &Path) -> Result<(ValidatorConfig, Arc<LineMetrics>)> {
    let basic_tracing = init_tracing_basic();

    info!("Starting log-validator v{}", env!("CARGO_PKG_VERSION"));

    let config = ValidatorConfig::load(config_path).context("Failed to load configuration")?;

    // free the thread-local slot before installing the global subscriber
    drop(basic_tracing);
    init_tracing_from_config(&config).context("Failed to initialise logging")?;

    info!(files = config.files.len(), "Configuration loaded successfully");
    Ok((config, Arc::new(LineMetrics::new())))
}

/// Batch mode: diagnostics go to stderr, any invalid line is an error.
pub fn check_file(path: &Path) -> Result<()> {
    let stderr = std::io::stderr();
    let mut report = stderr.lock();
    let summary = batch::check_file(path, &mut report)
        .with_context(|| format!("Checking {} failed", path.display()))?;
    info!(
        filename = %path.display(),
        checked = summary.checked,
        "All lines valid"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidatorError;
    use crate::line::log_line_checksum;

    #[test]
    fn test_boot_rejects_bad_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("validator.json");
        std::fs::write(&path, r#"{"files": []}"#).unwrap();

        let err = boot(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
        assert!(matches!(
            err.downcast_ref::<ValidatorError>(),
            Some(ValidatorError::Config(_))
        ));
    }

    #[test]
    fn test_check_file_outcomes() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.log");
        let bad = dir.path().join("bad.log");
        std::fs::write(
            &good,
            format!("t h d s tag {} fine\n", log_line_checksum("fine")),
        )
        .unwrap();
        std::fs::write(&bad, "t h d s tag nope fine\n").unwrap();

        assert!(check_file(&good).is_ok());
        let err = check_file(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidatorError>(),
            Some(ValidatorError::InvalidLines { count: 1 })
        ));
    }
}
