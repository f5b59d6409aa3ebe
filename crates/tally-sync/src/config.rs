//! # Sync Configuration
//!
//! Configuration management for the sync engine and the time oracle.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DEVICE_ID=till-1                                             │
//! │     TALLY_SYNC_URL=https://example.com/api/sync                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/sync.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.tally.tally/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     auto-generated device_id, no endpoint, local clock only            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Till 1"
//!
//! [sync]
//! endpoint_url = "https://example.com/api/sync"
//! health_url = "https://example.com/health"
//! delivery_timeout_secs = 15
//! poll_interval_secs = 30
//! start_online = true
//!
//! [time]
//! url = "https://example.com/api/time"
//! timeout_secs = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier, sent with every batch.
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Till 1").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Tally Till".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Outbox delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Batch delivery URL. No URL means the queue only grows.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// URL probed with `HEAD` to decide online/offline.
    #[serde(default)]
    pub health_url: Option<String>,

    /// Bound on one batch delivery (seconds).
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,

    /// Interval between connectivity probes / retry flushes (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Initial connectivity assumption before the first probe.
    #[serde(default = "default_true")]
    pub start_online: bool,
}

fn default_delivery_timeout() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            endpoint_url: None,
            health_url: None,
            delivery_timeout_secs: default_delivery_timeout(),
            poll_interval_secs: default_poll_interval(),
            start_online: true,
        }
    }
}

// =============================================================================
// Time Settings
// =============================================================================

/// Remote time source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSettings {
    /// Returns `{"datetime": "<RFC 3339>"}`. No URL means local clock only.
    #[serde(default)]
    pub url: Option<String>,

    /// Bound on one time fetch (seconds).
    #[serde(default = "default_time_timeout")]
    pub timeout_secs: u64,
}

fn default_time_timeout() -> u64 {
    3
}

impl Default for TimeSettings {
    fn default() -> Self {
        TimeSettings {
            url: None,
            timeout_secs: default_time_timeout(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Outbox delivery settings.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Time oracle settings.
    #[serde(default)]
    pub time: TimeSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        for url in [&self.sync.endpoint_url, &self.sync.health_url, &self.time.url]
            .into_iter()
            .flatten()
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::InvalidUrl(format!(
                    "URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.sync.delivery_timeout_secs == 0 || self.time.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig("timeouts must be greater than 0".into()));
        }

        if self.sync.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// [`SyncConfig::load`]).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("TALLY_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(name) = lookup("TALLY_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(url) = lookup("TALLY_SYNC_URL") {
            debug!(url = %url, "Overriding sync endpoint from environment");
            self.sync.endpoint_url = Some(url);
        }

        if let Some(url) = lookup("TALLY_HEALTH_URL") {
            self.sync.health_url = Some(url);
        }

        if let Some(url) = lookup("TALLY_TIME_URL") {
            debug!(url = %url, "Overriding time server from environment");
            self.time.url = Some(url);
        }

        if let Some(flag) = lookup("TALLY_START_OFFLINE") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sync.start_online = false,
                "0" | "false" | "no" => self.sync.start_online = true,
                _ => warn!(value = %flag, "Unknown TALLY_START_OFFLINE value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("sync.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.delivery_timeout_secs)
    }

    pub fn time_timeout(&self) -> Duration {
        Duration::from_secs(self.time.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty()); // Auto-generated
        assert!(config.sync.endpoint_url.is_none());
        assert!(config.sync.start_online);
        assert_eq!(config.time.timeout_secs, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.device.id = String::new();
        assert!(matches!(config.validate(), Err(SyncError::MissingDeviceId)));

        config.device.id = "till-1".to_string();
        config.sync.endpoint_url = Some("ws://invalid".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.sync.endpoint_url = Some("https://example.com/sync".to_string());
        assert!(config.validate().is_ok());

        config.time.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TALLY_DEVICE_ID", "till-9"),
            ("TALLY_SYNC_URL", "https://example.com/sync"),
            ("TALLY_TIME_URL", "https://example.com/time"),
            ("TALLY_START_OFFLINE", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.device_id(), "till-9");
        assert_eq!(config.sync.endpoint_url.as_deref(), Some("https://example.com/sync"));
        assert_eq!(config.time.url.as_deref(), Some("https://example.com/time"));
        assert!(!config.sync.start_online);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [device]
            id = "till-1"

            [sync]
            endpoint_url = "https://example.com/sync"
            poll_interval_secs = 10
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.name, "Tally Till");
        assert_eq!(config.sync.poll_interval_secs, 10);
        assert_eq!(config.sync.delivery_timeout_secs, 15);

        let out = toml::to_string_pretty(&config).unwrap();
        assert!(out.contains("[device]"));
        assert!(out.contains("[sync]"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");

        let mut config = SyncConfig::default();
        config.device.id = "till-7".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded: SyncConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.device.id, "till-7");
    }
}
