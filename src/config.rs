//! Application configuration
//!
//! Loaded from a TOML file (`~/.config/uptime-watch/config.toml` by
//! default). Every section falls back to its defaults, so an empty or
//! partial file is a valid config.
//!
//! ```toml
//! [monitor]
//! interval_secs = 300
//! probe_timeout_secs = 5
//!
//! [telegram]
//! bot_token = "123456:ABC..."
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::database::DatabaseConfig;
use crate::infrastructure::http::ProbeMethod;
use crate::infrastructure::telegram::DEFAULT_API_BASE_URL;

/// Environment variable holding the config file path
pub const CONFIG_ENV: &str = "UPTIME_WATCH_CONFIG";

/// Environment variable consulted when `telegram.bot_token` is unset
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `~/.config/uptime-watch/config.toml`, or `./config.toml` when there is
/// no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("uptime-watch"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub notifications: NotificationsConfig,
    pub telegram: TelegramConfig,
    pub database: DatabaseSettings,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_method: ProbeMethod,
    /// Let a tick start while the previous one is still running
    pub allow_overlap: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            probe_timeout_secs: 5,
            probe_method: ProbeMethod::Get,
            allow_overlap: true,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Also alert when an endpoint comes back after an outage
    pub notify_on_recovery: bool,
    /// Send every alert here instead of to the endpoint's owner
    pub admin_chat_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, created if missing
    pub path: String,
    /// Keep the registry in process memory only
    pub in_memory: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "./uptime-watch.db".to_string(),
            in_memory: false,
        }
    }
}

impl DatabaseSettings {
    pub fn connection(&self) -> DatabaseConfig {
        DatabaseConfig::sqlite(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Prometheus scrape address
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9100".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Seconds to wait for background tasks on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: 30,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults. `BOT_TOKEN`
    /// fills in an unset bot token.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };
        Ok(config.with_fallback_token(std::env::var(BOT_TOKEN_ENV).ok()))
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Write as TOML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(io_err)
    }

    fn with_fallback_token(mut self, token: Option<String>) -> Self {
        if self.telegram.bot_token.as_deref().map_or(true, str::is_empty) {
            self.telegram.bot_token = token.filter(|t| !t.is_empty());
        }
        self
    }

    /// Non-empty bot token, if any
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram.bot_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Invalid("monitor.interval_secs must be positive".into()));
        }
        if self.monitor.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.probe_timeout_secs must be positive".into(),
            ));
        }
        if self.metrics.enabled && self.metrics.listen.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "metrics.listen is not a socket address: {}",
                self.metrics.listen
            )));
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be text or json, got {}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
