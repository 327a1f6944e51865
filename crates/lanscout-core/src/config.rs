//! Configuration system for lanscout.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LANSCOUT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/lanscout/config.toml
//!   3. ~/.config/lanscout/config.toml

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::subnet::{SubnetPrefix, BRIDGED_SUBNET};
use crate::wire::{DeviceKind, PROBE_PORT};

/// Scan intervals below this are clamped; a zero period would spin.
pub const MIN_SCAN_FREQUENCY_MS: u64 = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanscoutConfig {
    pub scan: ScanConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Start scanning as soon as the engine is built.
    pub auto_start: bool,
    /// Broadcast and monitor cycle interval.
    pub scan_frequency_ms: u64,
    /// A device silent for longer than this is demoted to offline.
    pub disconnect_timeout_ms: u64,
    /// Drop offline devices from the roster instead of keeping them.
    pub remove_on_disconnect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Destination port for probes.
    pub probe_port: u16,
    /// Replies whose third octet matches this prefix are marked bridged.
    /// The prefix is always probed in addition to the local subnet.
    pub bridged_subnet: SubnetPrefix,
    /// Further subnets to probe every cycle.
    pub extra_subnets: Vec<SubnetPrefix>,
    /// Local address used to derive the primary subnet. None = auto-detect.
    pub local_address: Option<Ipv4Addr>,
    /// Device kinds whose probe is broadcast each cycle.
    pub probes: Vec<DeviceKind>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            scan_frequency_ms: 1_000,
            disconnect_timeout_ms: 3_000,
            remove_on_disconnect: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_port: PROBE_PORT,
            bridged_subnet: BRIDGED_SUBNET,
            extra_subnets: Vec::new(),
            local_address: None,
            probes: vec![DeviceKind::Jtag],
        }
    }
}

impl ScanConfig {
    pub fn scan_frequency(&self) -> Duration {
        Duration::from_millis(self.scan_frequency_ms.max(MIN_SCAN_FREQUENCY_MS))
    }

    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("lanscout")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LanscoutConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            LanscoutConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LANSCOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&LanscoutConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply LANSCOUT_* env var overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LANSCOUT_SCAN__AUTO_START") {
            self.scan.auto_start = is_truthy(&v);
        }
        if let Some(ms) = env_parse("LANSCOUT_SCAN__SCAN_FREQUENCY_MS") {
            self.scan.scan_frequency_ms = ms;
        }
        if let Some(ms) = env_parse("LANSCOUT_SCAN__DISCONNECT_TIMEOUT_MS") {
            self.scan.disconnect_timeout_ms = ms;
        }
        if let Ok(v) = std::env::var("LANSCOUT_SCAN__REMOVE_ON_DISCONNECT") {
            self.scan.remove_on_disconnect = is_truthy(&v);
        }
        if let Some(port) = env_parse("LANSCOUT_NETWORK__PROBE_PORT") {
            self.network.probe_port = port;
        }
        if let Some(prefix) = env_parse("LANSCOUT_NETWORK__BRIDGED_SUBNET") {
            self.network.bridged_subnet = prefix;
        }
        if let Some(addr) = env_parse("LANSCOUT_NETWORK__LOCAL_ADDRESS") {
            self.network.local_address = Some(addr);
        }
    }
}

fn is_truthy(v: &str) -> bool {
    v == "true" || v == "1"
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
