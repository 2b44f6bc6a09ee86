//! Configuration for quota-rs

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{QuotaError, Result};
use crate::ledger::{ReplenishMode, ReplenishPolicy};
use crate::sync::SyncSchedule;

/// Main quota service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8082")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Ledger storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

/// User directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    /// Base URL of the user service
    #[serde(default = "default_directory_url")]
    pub url: String,
    /// Timeout for one directory request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pause between sync passes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause before retrying an unreachable directory
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Quota accounting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Quota given to a newly discovered user
    #[serde(default = "default_quota")]
    pub default_quota: i64,
    /// Time between replenishment ticks
    #[serde(default = "default_replenish_interval_ms")]
    pub replenish_interval_ms: u64,
    /// Units added per tick to entries below the ceiling
    #[serde(default = "default_increment")]
    pub increment: i64,
    /// Entries at or above the ceiling are not replenished
    #[serde(default = "default_ceiling")]
    pub ceiling: i64,
    /// Clamp applied when raising an entry
    #[serde(default)]
    pub mode: ReplenishMode,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8082".to_string()
}

fn default_database_url() -> String {
    "sqlite://quota.db".to_string()
}

fn default_directory_url() -> String {
    "http://localhost:8083".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_quota() -> i64 {
    5
}

fn default_replenish_interval_ms() -> u64 {
    3_000
}

fn default_increment() -> i64 {
    3
}

fn default_ceiling() -> i64 {
    default_quota() * 2
}

fn default_log_level() -> String {
    "quota_rs=info,tower_http=info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_quota: default_quota(),
            replenish_interval_ms: default_replenish_interval_ms(),
            increment: default_increment(),
            ceiling: default_ceiling(),
            mode: ReplenishMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuotaError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| QuotaError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.directory.url).map_err(|e| {
            QuotaError::Config(format!(
                "Invalid directory URL '{}': {}",
                self.directory.url, e
            ))
        })?;

        let quota = &self.quota;
        if quota.default_quota < 0 {
            return Err(QuotaError::Config("default_quota must be >= 0".to_string()));
        }
        if quota.increment < 0 {
            return Err(QuotaError::Config("increment must be >= 0".to_string()));
        }
        if quota.ceiling < 0 {
            return Err(QuotaError::Config("ceiling must be >= 0".to_string()));
        }
        if quota.ceiling.checked_add(quota.increment).is_none() {
            return Err(QuotaError::Config(format!(
                "ceiling {} + increment {} overflows",
                quota.ceiling, quota.increment
            )));
        }
        if quota.replenish_interval_ms == 0 {
            return Err(QuotaError::Config(
                "replenish_interval_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn replenish_policy(&self) -> ReplenishPolicy {
        ReplenishPolicy::new(self.quota.increment, self.quota.ceiling).with_mode(self.quota.mode)
    }

    pub fn replenish_interval(&self) -> Duration {
        Duration::from_millis(self.quota.replenish_interval_ms)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory.request_timeout_ms)
    }

    pub fn sync_schedule(&self) -> SyncSchedule {
        SyncSchedule {
            poll_interval: Duration::from_millis(self.directory.poll_interval_ms),
            retry_delay: Duration::from_millis(self.directory.retry_delay_ms),
        }
    }
}
