use super::{ConfigError, DatabaseConfig, LoggingConfig, RedirectorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/squid-tagger.toml";

/// Main configuration, resolved once at startup and handed to each component.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub log: LoggingConfig,

    #[serde(default)]
    pub redirector: RedirectorConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub silent: bool,
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists.
    ///
    /// An explicitly given path must be readable; a missing default file
    /// falls back to built-in defaults.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };

        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_string(),
            source,
        })?;

        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.to_string(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(workers) = overrides.workers {
            self.redirector.workers = workers;
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.redirector.queue_capacity = capacity;
        }
        if overrides.silent {
            self.log.silent = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redirector.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "redirector.queue_capacity must be at least 1".to_string(),
            ));
        }

        if !(300..=399).contains(&self.redirector.redirect_status) {
            return Err(ConfigError::Validation(format!(
                "redirector.redirect_status {} is not a 3xx code",
                self.redirector.redirect_status
            )));
        }

        if self.redirector.query_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "redirector.query_timeout_ms must be positive".to_string(),
            ));
        }

        if self.database.database.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.database cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
