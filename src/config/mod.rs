//! Configuration management for AutoBill
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use autobill::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any setting can be overridden with `AUTOBILL__<section>__<key>`:
//! - `AUTOBILL__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `AUTOBILL__STORE__DATABASE_PATH=/var/lib/autobill/transactions.db`
//! - `AUTOBILL__STREAM__HEARTBEAT_INTERVAL=30s`
//!
//! The shared API key is only read from `API_KEY`.
//!
//! # Configuration File
//!
//! Loaded from `config/autobill.toml` unless `AUTOBILL_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{ApiLimits, Config, ServerConfig, StoreConfig, StreamConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment + secrets)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// Secrets are not looked up; the API key keeps its default.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Replace the shared API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.server.api_key = api_key.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[store]\ndatabase_path = \"tx.db\"\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.store.database_path.to_str(), Some("tx.db"));
        assert_eq!(config.server.api.snapshot_limit, 50);
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[stream]\nbatch_size = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidBatchSize { .. })
        ));
    }

    #[test]
    fn test_with_api_key() {
        let config = Config::default().with_api_key("s3cret");
        assert_eq!(config.server.api_key, "s3cret");
    }
}
