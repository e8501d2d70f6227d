//! Configuration module for the Serial Debug Monitor
//!
//! Application configuration is a single TOML file stored in the
//! platform-appropriate data directory:
//!
//! - **Linux**: `~/.local/share/serialdbg-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/serialdbg-rs/config.toml`
//! - **Windows**: `%APPDATA%\serialdbg-rs\config.toml`
//!
//! A missing or unreadable file falls back to defaults with a logged
//! warning; the tool must stay usable on a fresh machine.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "serialdbg-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
///
/// The timeout bounds how long a blocking read can keep the acquisition
/// loop from re-observing operator intent, so it also bounds stop latency.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 200;

/// Default idle re-check interval in milliseconds
pub const DEFAULT_IDLE_POLL_MS: u64 = 100;

/// Default number of additional lines read after a decode failure before
/// the cycle gives up
pub const DEFAULT_DECODE_RETRY_LIMIT: u32 = 1;

/// Default consumer tick period in milliseconds
pub const DEFAULT_CONSUMER_TICK_MS: u64 = 50;

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Baud rate used when opening a port
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Acquisition loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// How long the loop sleeps between idle re-checks, in milliseconds
    pub idle_poll_ms: u64,
    /// How many additional lines are read after a decode failure before
    /// the cycle gives up
    pub decode_retry_limit: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            decode_retry_limit: DEFAULT_DECODE_RETRY_LIMIT,
        }
    }
}

impl AcquisitionConfig {
    /// Idle re-check interval as a [`Duration`]
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Drain period in milliseconds
    pub tick_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_CONSUMER_TICK_MS,
        }
    }
}

impl ConsumerConfig {
    /// Drain period as a [`Duration`]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub acquisition: AcquisitionConfig,
    pub consumer: ConsumerConfig,
}

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        MonitorError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            MonitorError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

impl AppConfig {
    /// Load the config from the default location
    pub fn load() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| MonitorError::Config("Could not determine config path".to_string()))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load the config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        let path = dir.join(CONFIG_FILE);

        let content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Serialization(e.to_string()))?;

        std::fs::write(&path, content)
            .map_err(|e| MonitorError::Config(format!("Failed to write config: {}", e)))
    }
}
