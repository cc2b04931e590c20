//! Inspector configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to its
//! default; `validate()` rejects bounds that would disable a safety guard.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{HistoryError, HistoryResult};
use crate::observability::{log_event_with_fields, Event, Severity};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Bound passed to bulk history retrieval ("all of it")
    #[serde(default = "default_history_size_cap")]
    pub history_size_cap: u64,

    /// Staleness bound of the shared marker cache, in seconds (0 = always refresh)
    #[serde(default = "default_marker_cache_ttl_secs")]
    pub marker_cache_ttl_secs: u64,

    /// Maximum number of leaves walked in one chained map
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,

    /// Maximum number of parents followed when building a path
    #[serde(default = "default_max_parent_depth")]
    pub max_parent_depth: usize,

    /// Minimum logged severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_history_size_cap() -> u64 {
    999_999_999_999
}
fn default_marker_cache_ttl_secs() -> u64 {
    300
} // 5 minutes
fn default_max_chain_length() -> usize {
    100_000
}
fn default_max_parent_depth() -> usize {
    256
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            history_size_cap: default_history_size_cap(),
            marker_cache_ttl_secs: default_marker_cache_ttl_secs(),
            max_chain_length: default_max_chain_length(),
            max_parent_depth: default_max_parent_depth(),
            log_level: default_log_level(),
        }
    }
}

impl InspectorConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> HistoryResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| HistoryError::Config(format!("Failed to read config: {}", e)))?;

        let config: InspectorConfig = serde_json::from_str(&content)
            .map_err(|e| HistoryError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let path_display = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path_display.as_str())]);

        Ok(config)
    }

    pub fn validate(&self) -> HistoryResult<()> {
        if self.history_size_cap == 0 {
            return Err(HistoryError::Config("history_size_cap must be > 0".into()));
        }
        if self.max_chain_length == 0 {
            return Err(HistoryError::Config("max_chain_length must be > 0".into()));
        }
        if self.max_parent_depth == 0 {
            return Err(HistoryError::Config("max_parent_depth must be > 0".into()));
        }
        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> HistoryResult<Severity> {
        self.log_level.parse().map_err(HistoryError::Config)
    }

    pub fn marker_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.marker_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = InspectorConfig::default();
        assert_eq!(config.history_size_cap, 999_999_999_999);
        assert_eq!(config.marker_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.log_severity().unwrap(), Severity::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_chain_length": 12, "log_level": "warn"}}"#).unwrap();

        let config = InspectorConfig::load(file.path()).unwrap();
        assert_eq!(config.max_chain_length, 12);
        assert_eq!(config.max_parent_depth, 256);
        assert_eq!(config.log_severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_zero_chain_length_rejected() {
        let config = InspectorConfig {
            max_chain_length: 0,
            ..InspectorConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code(), "OBJSCOPE_CONFIG");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = InspectorConfig {
            log_level: "chatty".into(),
            ..InspectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = InspectorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = InspectorConfig::load(Path::new("/nonexistent/objscope.json")).unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }
}
