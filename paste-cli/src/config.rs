//! Configuration loading for the pastebin CLI.
//!
//! Configuration is loaded from a TOML file (default: `pastebin.toml` in the
//! data directory). Every section and field is optional.

use paste_client::{HttpRemoteConfig, RepositoryConfig, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file looked up in the data directory.
pub const CONFIG_FILE_NAME: &str = "pastebin.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Remote API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Local cache configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Reconciliation configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the address API (default: https://api.omg.lol/address/).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file, relative paths resolve against the data
    /// directory (default: pastebin.db).
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Reconciliation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Whether fetched pastes replace unsynced local edits (default: true).
    #[serde(default = "default_override_unsynced")]
    pub override_unsynced: bool,
    /// Pause after a failed fetch before showing cached data, in
    /// milliseconds (default: 1000).
    #[serde(default = "default_error_delay_ms")]
    pub error_delay_ms: u64,
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> PathBuf {
    PathBuf::from("pastebin.db")
}

fn default_override_unsynced() -> bool {
    true
}

fn default_error_delay_ms() -> u64 {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            override_unsynced: default_override_unsynced(),
            error_delay_ms: default_error_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the explicit config file, or the one in the data directory if
    /// present, or the defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = data_dir.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Absolute location of the database file.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            data_dir.join(&self.storage.database)
        }
    }

    /// Settings for the HTTP remote.
    pub fn remote_config(&self) -> HttpRemoteConfig {
        HttpRemoteConfig::default()
            .with_base_url(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs))
    }

    /// Settings for the paste repository.
    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig::default()
            .with_error_display_delay(Duration::from_millis(self.sync.error_delay_ms))
            .with_override_unsynced(self.sync.override_unsynced)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
