//! Configuration file handling with TOML support.

use crate::api::DEFAULT_API_URL;
use crate::reconcile::DEFAULT_DATE_FORMAT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Whose alerts to manage
    #[serde(default)]
    pub user: UserConfig,

    /// Polling behaviour
    #[serde(default)]
    pub watch: WatchConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Owning user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Refresh interval in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: f64,

    /// Ring the terminal bell when an alert fires
    #[serde(default)]
    pub audio_alerts: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            audio_alerts: false,
        }
    }
}

fn default_refresh_interval() -> f64 {
    30.0
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// chrono format string for the created-at column
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Route of the ticker detail view
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            dashboard_path: default_dashboard_path(),
        }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}
fn default_dashboard_path() -> String {
    "/dashboard".to_string()
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to load config: {:#}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("alertwatch").join("config.toml"))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# alertwatch configuration file

[api]
# Base URL of the alerts REST API
base_url = "http://localhost:8080/api"
# Request timeout in seconds
timeout = 10

[user]
# Your user id
id = 7

[watch]
# Refresh interval in seconds (minimum 1)
refresh_interval = 30.0
# Ring the terminal bell when an alert fires
audio_alerts = false

[display]
date_format = "%Y-%m-%d %H:%M:%S"
dashboard_path = "/dashboard"

[logging]
level = "warn"
# file = "/tmp/alertwatch.log"
"##
}
