//! Adapter configuration
//!
//! Loaded from JSON; every field but the bucket pair has a default.
//!
//! ```json
//! { "bucket_type": "models", "bucket_name": "person", "enable_versions": false }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "CONFIG_IO_FAILED",
            ConfigError::Parse(_) => "CONFIG_MALFORMED",
            ConfigError::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Settings of one model's adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub bucket_type: String,
    pub bucket_name: String,

    /// Rows requested when a query sets none (default: 1000)
    #[serde(default = "default_row_size")]
    pub row_size: u64,

    /// Write a version snapshot on every save (default: true)
    #[serde(default = "default_true")]
    pub enable_versions: bool,

    /// Write an activity log entry on every save (default: true)
    #[serde(default = "default_true")]
    pub enable_activity_logging: bool,

    /// Report reads and writes to the observability sink
    #[serde(default)]
    pub debug: bool,

    /// Verbosity; 5 and above also logs every compiled query
    #[serde(default)]
    pub debug_level: u8,

    /// Host of the search node, used for faceting requests
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_facet_port")]
    pub facet_port: u16,

    #[serde(default = "default_batch_poll_ms")]
    pub batch_poll_interval_ms: u64,

    #[serde(default = "default_clear_poll_ms")]
    pub clear_poll_interval_ms: u64,

    /// Give up a batch wait after this many polls; unbounded when absent
    #[serde(default)]
    pub batch_max_attempts: Option<u32>,
}

fn default_row_size() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_facet_port() -> u16 {
    8093
}

fn default_batch_poll_ms() -> u64 {
    400
}

fn default_clear_poll_ms() -> u64 {
    300
}

impl AdapterConfig {
    /// Defaults for the `bucket_type`/`bucket_name` pair
    pub fn new(bucket_type: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_type: bucket_type.into(),
            bucket_name: bucket_name.into(),
            row_size: default_row_size(),
            enable_versions: true,
            enable_activity_logging: true,
            debug: false,
            debug_level: 0,
            server: default_server(),
            facet_port: default_facet_port(),
            batch_poll_interval_ms: default_batch_poll_ms(),
            clear_poll_interval_ms: default_clear_poll_ms(),
            batch_max_attempts: None,
        }
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: AdapterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.bucket_type.is_empty() || self.bucket_name.is_empty() {
            return Err(ConfigError::Invalid(
                "bucket_type and bucket_name must be set".to_string(),
            ));
        }
        if self.batch_max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "batch_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_row_size(mut self, rows: u64) -> Self {
        self.row_size = rows;
        self
    }

    pub fn with_versions(mut self, enabled: bool) -> Self {
        self.enable_versions = enabled;
        self
    }

    pub fn with_activity_logging(mut self, enabled: bool) -> Self {
        self.enable_activity_logging = enabled;
        self
    }

    pub fn with_debug(mut self, level: u8) -> Self {
        self.debug = true;
        self.debug_level = level;
        self
    }

    pub fn with_batch_poll_interval(mut self, interval: Duration) -> Self {
        self.batch_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_clear_poll_interval(mut self, interval: Duration) -> Self {
        self.clear_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_batch_max_attempts(mut self, attempts: u32) -> Self {
        self.batch_max_attempts = Some(attempts);
        self
    }

    /// Search index of the data bucket
    pub fn index_name(&self) -> String {
        format!("{}_{}", self.bucket_type, self.bucket_name)
    }

    /// Bucket type holding version records
    pub fn version_bucket_type(&self) -> String {
        format!("{}_version", self.bucket_type)
    }

    /// Bucket name holding this model's version records
    pub fn version_bucket_name(&self) -> String {
        format!("{}_version", self.bucket_name)
    }

    /// Bucket name holding this model's activity log
    pub fn log_bucket_name(&self) -> String {
        format!("{}_log", self.bucket_name)
    }

    pub fn batch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.batch_poll_interval_ms)
    }

    pub fn clear_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clear_poll_interval_ms)
    }

    /// Compiled queries are logged
    pub fn traces_queries(&self) -> bool {
        self.debug && self.debug_level >= 5
    }

    /// `http://{server}:{port}/internal_solr/{index}/select`
    pub fn facet_endpoint(&self) -> String {
        format!(
            "http://{}:{}/internal_solr/{}/select",
            self.server,
            self.facet_port,
            self.index_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::from_json_str(
            r#"{"bucket_type": "models", "bucket_name": "person"}"#,
        )
        .unwrap();
        assert_eq!(config, AdapterConfig::new("models", "person"));
        assert_eq!(config.row_size, 1000);
        assert!(config.enable_versions);
        assert!(config.enable_activity_logging);
        assert!(!config.debug);
        assert_eq!(config.batch_poll_interval(), Duration::from_millis(400));
        assert_eq!(config.batch_max_attempts, None);
    }

    #[test]
    fn test_derived_names() {
        let config = AdapterConfig::new("models", "person");
        assert_eq!(config.index_name(), "models_person");
        assert_eq!(config.version_bucket_type(), "models_version");
        assert_eq!(config.version_bucket_name(), "person_version");
        assert_eq!(config.log_bucket_name(), "person_log");
        assert_eq!(
            config.facet_endpoint(),
            "http://localhost:8093/internal_solr/models_person/select"
        );
    }

    #[test]
    fn test_trace_needs_debug_level() {
        assert!(!AdapterConfig::new("m", "p").traces_queries());
        assert!(!AdapterConfig::new("m", "p").with_debug(4).traces_queries());
        assert!(AdapterConfig::new("m", "p").with_debug(5).traces_queries());
    }

    #[test]
    fn test_invalid() {
        let err = AdapterConfig::from_json_str(r#"{"bucket_type": "", "bucket_name": "p"}"#)
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");

        let err = AdapterConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code(), "CONFIG_MALFORMED");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bucket_type": "models", "bucket_name": "person", "row_size": 50, "batch_max_attempts": 3}}"#
        )
        .unwrap();

        let config = AdapterConfig::load(file.path()).unwrap();
        assert_eq!(config.row_size, 50);
        assert_eq!(config.batch_max_attempts, Some(3));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AdapterConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "CONFIG_IO_FAILED");
    }
}
