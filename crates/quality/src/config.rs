//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{QualityError, Result};
use crate::history::HistoryConfig;
use crate::runner::RunnerConfig;

/// Which history store to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per inspection
    #[default]
    Json,
    /// Process memory; nothing survives exit
    Memory,
    /// SQLite database file
    Sqlite,
}

/// History store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StorageBackend,

    /// Store root directory (JSON) or database file (SQLite)
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".portdq")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// Upstream row-fetch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL prefixed to every data type endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Bearer token sent with every fetch
    #[serde(default)]
    pub bearer_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            bearer_token: None,
        }
    }
}

/// History bucketing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Hours east of UTC used to pick calendar buckets
    #[serde(default)]
    pub utc_offset_hours: i32,

    /// Custom ranges longer than this are bucketed weekly
    #[serde(default = "default_weekly_threshold_days")]
    pub custom_weekly_threshold_days: i64,
}

fn default_weekly_threshold_days() -> i64 {
    60
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            custom_weekly_threshold_days: default_weekly_threshold_days(),
        }
    }
}

/// Top-level configuration, read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// History store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream row source
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// History bucketing
    #[serde(default)]
    pub history: HistorySettings,

    /// Catalog file replacing the built-in catalog
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from a file, or defaults when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            QualityError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
            .map_err(|e| QualityError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Runner settings derived from this configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            fetch_timeout: Duration::from_secs(self.upstream.fetch_timeout_secs),
        }
    }

    /// History settings derived from this configuration.
    pub fn history_config(&self) -> Result<HistoryConfig> {
        let hours = self.history.utc_offset_hours;
        let utc_offset = FixedOffset::east_opt(hours * 3600).ok_or_else(|| {
            QualityError::Configuration(format!("utc_offset_hours {hours} is out of range"))
        })?;
        Ok(HistoryConfig {
            utc_offset,
            weekly_threshold_days: self.history.custom_weekly_threshold_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.upstream.fetch_timeout_secs, 30);
        assert_eq!(config.history.custom_weekly_threshold_days, 60);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = AppConfig::from_json_str(
            r#"{"storage": {"backend": "sqlite"}, "history": {"utc_offset_hours": 9}}"#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from(".portdq"));

        let history = config.history_config().unwrap();
        assert_eq!(history.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(config.runner_config().fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let config = AppConfig::from_json_str(r#"{"history": {"utc_offset_hours": 30}}"#).unwrap();
        assert!(matches!(config.history_config(), Err(QualityError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portdq.json");
        tokio::fs::write(&path, r#"{"upstream": {"base_url": "http://tos:9000", "bearer_token": "t"}}"#)
            .await
            .unwrap();

        let config = AppConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.upstream.base_url, "http://tos:9000");
        assert_eq!(config.upstream.bearer_token.as_deref(), Some("t"));

        assert_eq!(AppConfig::load(None).await.unwrap(), AppConfig::default());
        assert!(AppConfig::load(Some(&dir.path().join("missing.json"))).await.is_err());
    }
}
