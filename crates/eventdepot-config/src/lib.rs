// eventdepot-config - Runtime configuration for the event depot
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from EVENTDEPOT_CONFIG env var
// 3. Config file contents from EVENTDEPOT_CONFIG_CONTENT env var
// 4. Default config file location (./eventdepot.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub depot: DepotConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Where and how batches are delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub host: String,
    pub path: String,
    /// Appended verbatim after the path, including any leading `?`
    pub query_params: String,
    pub request_timeout_ms: u64,
}

impl CollectorConfig {
    /// Absolute URI that new bins are addressed to.
    pub fn destination(&self) -> String {
        format!(
            "{}{}{}",
            self.host.trim_end_matches('/'),
            self.path,
            self.query_params
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: "https://data.splyt.com".to_string(),
            path: "/isos-personalization/ws/interface/datacollector_batch".to_string(),
            query_params: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Batching, archive, and throttling limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub max_events_per_bin: usize,
    pub archive_slots: usize,
    pub min_send_period_ms: u64,
    pub max_send_period_ms: u64,
    pub pause_drain_timeout_ms: u64,
}

impl DepotConfig {
    pub fn pause_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.pause_drain_timeout_ms)
    }
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            max_events_per_bin: 50,
            archive_slots: 201,
            min_send_period_ms: 5_000,
            max_send_period_ms: 30_000,
            pause_drain_timeout_ms: 2_000,
        }
    }
}

/// Durable record location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./eventdepot-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if no config file exists.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.collector = other.collector;
        self.depot = other.depot;
        self.storage = other.storage;
        self.logging = other.logging;
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration from inline TOML plus overrides supplied by an
    /// `EnvSource`, without touching the host environment or filesystem.
    pub fn load_with_env<E: EnvSource>(inline_config: Option<&str>, env: &E) -> Result<Self> {
        let mut config = RuntimeConfig::default();

        if let Some(inline) = inline_config {
            let file_config: RuntimeConfig =
                toml::from_str(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<String, String>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> MapEnv {
        MapEnv(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let depot = DepotConfig::default();
        assert_eq!(depot.max_events_per_bin, 50);
        assert_eq!(depot.archive_slots, 201);
        assert_eq!(depot.min_send_period_ms, 5_000);
        assert_eq!(depot.max_send_period_ms, 30_000);

        let logging = LogConfig::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Text);
    }

    #[test]
    fn test_destination_joins_host_path_and_query() {
        let collector = CollectorConfig {
            host: "https://collector.example/".to_string(),
            query_params: "?ssf_cust=acme".to_string(),
            ..CollectorConfig::default()
        };
        assert_eq!(
            collector.destination(),
            "https://collector.example/isos-personalization/ws/interface/datacollector_batch?ssf_cust=acme"
        );
    }

    #[test]
    fn test_partial_inline_config_keeps_section_defaults() {
        let inline = r#"
            [collector]
            host = "http://localhost:9000"

            [depot]
            max_events_per_bin = 10
        "#;
        let config = RuntimeConfig::load_with_env(Some(inline), &env(&[])).unwrap();
        assert_eq!(config.collector.host, "http://localhost:9000");
        assert_eq!(config.collector.request_timeout_ms, 10_000);
        assert_eq!(config.depot.max_events_per_bin, 10);
        assert_eq!(config.depot.archive_slots, 201);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_env_overrides_win_over_inline() {
        let inline = r#"
            [depot]
            max_events_per_bin = 10
        "#;
        let config = RuntimeConfig::load_with_env(
            Some(inline),
            &env(&[
                ("MAX_EVENTS_PER_BIN", "25"),
                ("REQUEST_TIMEOUT_MS", "2500"),
                ("LOG_FORMAT", "json"),
                ("STORAGE_PATH", "/var/lib/eventdepot"),
            ]),
        )
        .unwrap();
        assert_eq!(config.depot.max_events_per_bin, 25);
        assert_eq!(config.collector.request_timeout_ms, 2_500);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.path, "/var/lib/eventdepot");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let result = RuntimeConfig::load_with_env(None, &env(&[("ARCHIVE_SLOTS", "many")]));
        assert!(result.is_err());
    }
}
