//! File configuration via `kindstore.toml`
//!
//! Groups the store tuning and the update retry policy. Every table and every
//! field is optional; missing values take their defaults.

use std::path::{Path, PathBuf};

use kindstore_concurrency::RetryConfig;
use kindstore_storage::StoreConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "kindstore.toml";

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but cannot be used
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
///
/// # Example
///
/// ```toml
/// [store]
/// history_window = 1000
/// watch_buffer = 256
/// ttl_sweep_interval_ms = 1000
///
/// [retry]
/// base_delay_ms = 1
/// max_delay_ms = 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// In-memory store tuning
    #[serde(default)]
    pub store: StoreConfig,
    /// Retry policy for registry updates
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# kindstore configuration

[store]
# Change events kept for watch replay. Watching from an older
# resourceVersion fails with Gone.
history_window = 1000
# Per-watcher channel capacity. A watcher that falls this far behind
# is disconnected.
watch_buffer = 256
# How often expired keys are purged, in milliseconds
ttl_sweep_interval_ms = 1000

[retry]
# Maximum retries after a version conflict; omit for unbounded
# max_retries = 50
base_delay_ms = 1
max_delay_ms = 50
"#
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.retry.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_matches_default() {
        let parsed = Config::from_toml_str(Config::default_toml()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_tables() {
        let config = Config::from_toml_str(
            r#"
[store]
watch_buffer = 8

[retry]
max_retries = 3
"#,
        )
        .unwrap();
        assert_eq!(config.store.watch_buffer, 8);
        assert_eq!(config.store.history_window, 1000);
        assert_eq!(config.retry.max_retries, Some(3));
        assert_eq!(config.retry.max_delay_ms, 50);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::from_toml_str("[store\nwatch_buffer = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = Config::from_toml_str("[store]\nwatch_buffer = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_buffer_is_invalid() {
        let err = Config::from_toml_str("[store]\nwatch_buffer = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn inverted_delays_are_invalid() {
        let err =
            Config::from_toml_str("[retry]\nbase_delay_ms = 100\nmax_delay_ms = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
