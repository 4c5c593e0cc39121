// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for kubedash
//!
//! All kubedash data is stored under ~/.kubedash/:
//! - ~/.kubedash/config.json - user configuration
//! - ~/.kubedash/log/ - rotated log files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::correlator::CreatedByPolicy;
use crate::kubernetes::NamespaceQuery;

/// Get the base kubedash directory (~/.kubedash/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kubedash"))
        .context("Could not determine home directory")
}

/// Directory the rolling log files are written to
pub fn log_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("log"))
}

fn default_items_per_page() -> usize {
    20
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metric_resolution_secs() -> u64 {
    60
}

/// kubedash configuration
///
/// Every field has a default, so a partial or missing file is valid.
/// Command line flags take precedence over these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig context; the current context when unset
    #[serde(default)]
    pub context: Option<String>,

    /// Namespace(s) to list when none is given, comma separated
    #[serde(default)]
    pub default_namespace: Option<String>,

    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,

    /// Whether to query the metrics API at all
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Width of the time buckets metric series are aligned to
    #[serde(default = "default_metric_resolution_secs")]
    pub metric_resolution_secs: u64,

    /// What to do with jobs whose created-by annotation is malformed
    #[serde(default)]
    pub created_by_policy: CreatedByPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: None,
            default_namespace: None,
            items_per_page: default_items_per_page(),
            metrics_enabled: default_metrics_enabled(),
            metric_resolution_secs: default_metric_resolution_secs(),
            created_by_policy: CreatedByPolicy::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Get the config file path (~/.kubedash/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// Namespaces to list; all of them when none is configured
    pub fn namespace_query(&self) -> NamespaceQuery {
        NamespaceQuery::parse(self.default_namespace.as_deref().unwrap_or_default())
    }

    pub fn metric_resolution(&self) -> Duration {
        // zero would make every sample its own bucket boundary
        Duration::from_secs(self.metric_resolution_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.context.is_none());
        assert_eq!(config.items_per_page, 20);
        assert!(config.metrics_enabled);
        assert_eq!(config.metric_resolution(), Duration::from_secs(60));
        assert_eq!(config.created_by_policy, CreatedByPolicy::Skip);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"context": "prod", "created_by_policy": "fail"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.context.as_deref(), Some("prod"));
        assert_eq!(config.created_by_policy, CreatedByPolicy::Fail);
        assert_eq!(config.items_per_page, 20);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_zero_resolution_is_clamped() {
        let config = Config {
            metric_resolution_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.metric_resolution(), Duration::from_secs(1));
    }

    #[test]
    fn test_namespace_query() {
        assert_eq!(Config::default().namespace_query(), NamespaceQuery::All);
        let config = Config {
            default_namespace: Some("prod, staging".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.namespace_query(),
            NamespaceQuery::List(vec!["prod".to_string(), "staging".to_string()])
        );
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let config = Config {
            default_namespace: Some("prod,staging".to_string()),
            metrics_enabled: false,
            ..Config::default()
        };
        config.save_to(&config_path).unwrap();

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
