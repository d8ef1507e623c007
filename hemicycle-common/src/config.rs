//! Configuration loading and root folder resolution
//!
//! Resolution priority for the root folder:
//! 1. Environment variable (`HEMICYCLE_ROOT`)
//! 2. `root_folder` key in the TOML config file
//! 3. OS-dependent compiled default
//!
//! The config file itself is looked up at `$HEMICYCLE_CONFIG`, then at the
//! platform config directory (`~/.config/hemicycle/config.toml` on Linux).
//! A missing file is not an error: every field has a compiled default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "HEMICYCLE_ROOT";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "HEMICYCLE_CONFIG";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HemicycleConfig {
    /// Data directory holding the SQLite database
    pub root_folder: Option<PathBuf>,
    pub listen: ListenConfig,
    pub opendata: OpenDataConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
}

/// HTTP listen address for the service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5731,
        }
    }
}

/// Remote open-data API client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenDataConfig {
    pub base_url: String,
    /// Token-bucket budget for outbound requests (the platform asks for
    /// polite clients)
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for OpenDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.assemblee-nationale.fr/api/v2".to_string(),
            requests_per_second: 2,
            timeout_secs: 15,
            connect_timeout_secs: 5,
        }
    }
}

/// Identity cache tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries older than this are eligible for re-fetch
    pub freshness_hours: u64,
    /// Delay before re-attempting a still-loading visible identifier
    pub retry_delay_secs: u64,
    /// Total resolution attempts before giving up on auto-retry
    pub retry_max_attempts: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_hours: 24,
            retry_delay_secs: 10,
            retry_max_attempts: 3,
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.freshness_hours as i64)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Sync job tunables
///
/// The incremental batch size is deliberately small: it trades throughput
/// for resilience to transient store failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub full_batch_size: usize,
    pub incremental_batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_batch_size: 50,
            incremental_batch_size: 5,
        }
    }
}

impl HemicycleConfig {
    /// Load configuration from the resolved config file, falling back to
    /// compiled defaults when no file exists
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and parse a specific TOML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Resolve the data directory per the documented priority order
    pub fn resolve_root_folder(&self) -> PathBuf {
        if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.root_folder {
            return path.clone();
        }
        default_root_folder()
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.resolve_root_folder().join("hemicycle.db")
    }
}

/// Locate the config file: `$HEMICYCLE_CONFIG`, then the platform config dir
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("hemicycle").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hemicycle"))
        .unwrap_or_else(|| PathBuf::from("./hemicycle_data"))
}
