//! Configuration layer: typed settings with layered precedence (file → env).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";
const ENV_PREFIX: &str = "BRZ";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 1024;
const DEFAULT_ASSET_CACHE_DIR: &str = "cache/assets";
const DEFAULT_ASSET_BUDGET_BYTES: usize = 64 * 1024 * 1024;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub routing: RoutingSettings,
    pub assets: AssetCacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RoutingSettings {
    /// Maximum number of distinct paths retained in the match-result cache.
    pub cache_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AssetCacheSettings {
    /// Keep compressed artifacts on disk; disabled means recompute per
    /// request.
    pub disk_cache: bool,
    /// Directory exclusively owned by the artifact cache.
    pub directory: PathBuf,
    /// Index weight budget in bytes. Zero is allowed and yields a no-op
    /// cache.
    pub budget_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] ::config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from `config/default`, `brezza.toml`, and `BRZ__`-prefixed
/// environment variables, in that precedence order.
pub fn load() -> Result<Settings, LoadError> {
    load_with(None)
}

/// Like [`load`], with an explicit required configuration file layered last.
pub fn load_from(path: &Path) -> Result<Settings, LoadError> {
    load_with(Some(path))
}

fn load_with(explicit: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    routing: RawRoutingSettings,
    assets: RawAssetSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRoutingSettings {
    cache_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    disk_cache: Option<bool>,
    directory: Option<PathBuf>,
    budget_bytes: Option<usize>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let level_text = raw
            .logging
            .level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let level = LevelFilter::from_str(&level_text).map_err(|_| {
            LoadError::invalid(
                "logging.level",
                format!("`{level_text}` is not one of trace|debug|info|warn|error|off"),
            )
        })?;
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        Ok(Self {
            logging: LoggingSettings { level, format },
            routing: RoutingSettings {
                cache_capacity: raw
                    .routing
                    .cache_capacity
                    .unwrap_or(DEFAULT_ROUTE_CACHE_CAPACITY),
            },
            assets: AssetCacheSettings {
                disk_cache: raw.assets.disk_cache.unwrap_or(true),
                directory: raw
                    .assets
                    .directory
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_CACHE_DIR)),
                budget_bytes: raw.assets.budget_bytes.unwrap_or(DEFAULT_ASSET_BUDGET_BYTES),
            },
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawSettings::default())
            .unwrap_or_else(|_| unreachable!("defaults always resolve"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let settings = Settings::default();
        assert_eq!(settings.routing.cache_capacity, 1024);
        assert!(settings.assets.disk_cache);
        assert_eq!(settings.assets.directory, PathBuf::from("cache/assets"));
        assert_eq!(settings.assets.budget_bytes, 64 * 1024 * 1024);
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let raw = RawSettings {
            logging: RawLoggingSettings {
                level: Some("loud".to_string()),
                json: None,
            },
            ..Default::default()
        };
        let error = Settings::from_raw(raw).expect_err("invalid level");
        assert!(matches!(error, LoadError::Invalid { key: "logging.level", .. }));
    }

    #[test]
    fn json_flag_selects_format() {
        let raw = RawSettings {
            logging: RawLoggingSettings {
                level: None,
                json: Some(true),
            },
            ..Default::default()
        };
        let settings = Settings::from_raw(raw).expect("settings");
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_budget_is_allowed() {
        let raw = RawSettings {
            assets: RawAssetSettings {
                budget_bytes: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let settings = Settings::from_raw(raw).expect("settings");
        assert_eq!(settings.assets.budget_bytes, 0);
    }
}
