//! Configuration management for periapi
//!
//! A flat key-value store persisted as JSON. The session reads its username
//! and transport settings from here, and the API client caches the resolved
//! public id under [`PUBID_KEY`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Account username the session acts as
pub const USERNAME_KEY: &str = "username";
/// Cached public id of the account
pub const PUBID_KEY: &str = "pubid";
/// Override for the API base URL
pub const BASE_URL_KEY: &str = "base_url";
/// Request timeout in seconds
pub const TIMEOUT_KEY: &str = "timeout_secs";

/// Periscope API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.periscope.tv/api/v2/";
/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Persistent configuration mapping
#[derive(Debug, Clone, Default)]
pub struct Config {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from `path`, creating an empty file if it does not exist
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let values = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {:?}", path))?;
            Ok(Self { path, values })
        } else {
            let config = Self { path, values: BTreeMap::new() };
            config.write()?;
            Ok(config)
        }
    }

    /// Persist configuration to disk
    pub fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(&self.values)
            .with_context(|| "Failed to serialize config")?;

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config to {:?}", self.path))?;

        Ok(())
    }

    /// Get a value, treating empty strings as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Set a value in memory; call [`Config::write`] to persist
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value in memory, returning the old one
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// File this configuration is persisted to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// API base URL, honoring the `base_url` override
    pub fn base_url(&self) -> &str {
        self.get(BASE_URL_KEY).unwrap_or(DEFAULT_BASE_URL)
    }

    /// Request timeout, honoring the `timeout_secs` override
    pub fn timeout(&self) -> Duration {
        let secs = self
            .get(TIMEOUT_KEY)
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Get the path to the default config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "periapi").context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }
}
