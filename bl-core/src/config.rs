//! Application configuration management.
//!
//! Handles loading, saving, and accessing client configuration including
//! the booking API endpoint, realtime channel tuning, and booking policy
//! values. Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{BlError, BlResult};
use crate::platform::Platform;

/// Shared, mutable handle to the application configuration.
pub type ConfigHandle = Arc<RwLock<AppConfig>>;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Booking API connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Booking lifecycle policy values.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Booking API connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API base URL (e.g., "https://api.bookline.example").
    #[serde(default)]
    pub base_url: String,

    /// Identifier of the authenticated actor (seeker or provider).
    #[serde(default)]
    pub actor_id: String,

    /// API request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Realtime endpoint base URL; empty means derive from server.base_url.
    #[serde(default)]
    pub endpoint: String,

    /// Heartbeat ping interval in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,

    /// Maximum reconnect attempts before entering persistent offline.
    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,

    /// Base reconnect delay in seconds; attempt N waits base * N.
    #[serde(default = "default_base_delay_secs")]
    pub reconnect_base_delay_secs: u64,

    /// Cap for the reconnect delay in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
}

impl RealtimeConfig {
    /// Heartbeat interval as a Duration.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Booking lifecycle policy configuration.
///
/// These are tunable policy values, not hard-coded business knowledge:
/// the server remains authoritative, the client uses them for client-side
/// guard checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum referral chain length per booking.
    #[serde(default = "default_referral_cap")]
    pub referral_chain_cap: usize,

    /// One-sided attendance auto-completion timeout, in hours.
    #[serde(default = "default_attendance_timeout_hours")]
    pub attendance_timeout_hours: u32,

    /// Bounded OTP retry budget per booking.
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses the default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output for the file layer.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_api_timeout() -> u64 {
    crate::constants::DEFAULT_API_TIMEOUT_MS
}

fn default_heartbeat_secs() -> u64 {
    crate::constants::HEARTBEAT_INTERVAL_SECS
}

fn default_max_attempts() -> u32 {
    crate::constants::DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_base_delay_secs() -> u64 {
    crate::constants::DEFAULT_RECONNECT_BASE_DELAY_SECS
}

fn default_max_delay_secs() -> u64 {
    crate::constants::DEFAULT_RECONNECT_MAX_DELAY_SECS
}

fn default_referral_cap() -> usize {
    crate::constants::DEFAULT_REFERRAL_CHAIN_CAP
}

fn default_attendance_timeout_hours() -> u32 {
    crate::constants::DEFAULT_ATTENDANCE_TIMEOUT_HOURS
}

fn default_otp_max_attempts() -> u32 {
    crate::constants::DEFAULT_OTP_MAX_ATTEMPTS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            realtime: RealtimeConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            actor_id: String::new(),
            api_timeout_ms: default_api_timeout(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            heartbeat_interval_secs: default_heartbeat_secs(),
            max_reconnect_attempts: default_max_attempts(),
            reconnect_base_delay_secs: default_base_delay_secs(),
            reconnect_max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            referral_chain_cap: default_referral_cap(),
            attendance_timeout_hours: default_attendance_timeout_hours(),
            otp_max_attempts: default_otp_max_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> BlResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> BlResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> BlResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> BlResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BlError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> BlResult<PathBuf> {
        Ok(Platform::data_dir()?.join("config.toml"))
    }

    /// Whether the API endpoint and actor are configured.
    pub fn is_server_configured(&self) -> bool {
        !self.server.base_url.is_empty() && !self.server.actor_id.is_empty()
    }

    /// The effective realtime endpoint, falling back to the API base URL.
    pub fn effective_realtime_endpoint(&self) -> &str {
        if self.realtime.endpoint.is_empty() {
            &self.server.base_url
        } else {
            &self.realtime.endpoint
        }
    }

    /// The effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> BlResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Platform::log_dir()
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Wrap this config in a shared handle.
    pub fn into_handle(self) -> ConfigHandle {
        Arc::new(RwLock::new(self))
    }
}
