//! Configuration module for squid-tagger
//!
//! This module contains all configuration structures organized by concern:
//! - `root`: Main configuration and CLI overrides
//! - `database`: Policy store connection settings
//! - `logging`: Logging settings
//! - `redirector`: Worker pool, queue and reply format
//! - `errors`: Configuration errors

pub mod database;
pub mod errors;
pub mod logging;
pub mod redirector;
pub mod root;

pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use redirector::{RedirectorConfig, ResponseFormat};
pub use root::{CliOverrides, Config, DEFAULT_CONFIG_PATH};
