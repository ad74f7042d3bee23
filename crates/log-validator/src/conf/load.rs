//! Load — config loading from file and environment variables.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use super::model::ValidatorConfig;
use crate::error::{Result, ValidatorError};

pub const ENV_DEBUG_ADDR: &str = "LOG_VALIDATOR_DEBUG_ADDR";
pub const ENV_LOG_LEVEL: &str = "LOG_VALIDATOR_LOG_LEVEL";

impl ValidatorConfig {
    /// Load, apply environment overrides and validate.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading configuration from: {}", path.display());
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overwrite fields that have an environment variable set.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_DEBUG_ADDR) {
            self.debug_addr = addr;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.syslog.level = level;
        }
    }

    /// Parse a config file. `.json` files are read as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Check that values are sane before anything is started.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(ValidatorError::Config(
                "files must list at least one path".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            if file.as_os_str().is_empty() {
                return Err(ValidatorError::Config("files contains an empty path".to_string()));
            }
            if !seen.insert(file) {
                return Err(ValidatorError::Config(format!(
                    "file listed more than once: {}",
                    file.display()
                )));
            }
        }

        self.tail
            .to_tail_config()
            .validate()
            .map_err(|e| ValidatorError::Config(e.to_string()))?;

        self.debug_socket_addr()?;
        Ok(())
    }

    /// Parsed debug listen address; `None` when the listener is disabled.
    /// Accepts the host-less `:8000` form.
    pub fn debug_socket_addr(&self) -> Result<Option<SocketAddr>> {
        let addr = self.debug_addr.trim();
        if addr.is_empty() {
            return Ok(None);
        }
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        };
        full.parse()
            .map(Some)
            .map_err(|e| ValidatorError::Config(format!("invalid debugAddr {:?}: {}", addr, e)))
    }
}
