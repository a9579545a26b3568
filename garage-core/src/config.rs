use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::StoreConfig;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "GARAGE_CONFIG_PATH";
/// Environment variable overriding the database path
pub const DATABASE_ENV: &str = "GARAGE_DB";
/// Database file used when nothing else is configured
pub const DEFAULT_DATABASE: &str = "garage.db";

/// Settings read from the shop config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Path to the SQLite database
    pub database: Option<PathBuf>,
    /// How long to wait for another session's write lock, in milliseconds
    pub busy_timeout_ms: u64,
    /// Whether to enable write-ahead logging
    pub wal_mode: bool,
    /// Default number of cars listed by the most-serviced report
    pub report_limit: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            database: None,
            busy_timeout_ms: 5000,
            wal_mode: true,
            report_limit: 10,
        }
    }
}

impl ShopConfig {
    /// Loads the config from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the config if the file exists, otherwise returns defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Creates a default config file if it doesn't exist
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }
        Self::default().save(path)
    }

    /// Resolves the database path to use
    ///
    /// Priority: explicit path (the `--db` flag), then `GARAGE_DB`, then the
    /// config file's `database`, then `garage.db` in the current directory.
    pub fn resolve_database_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = env::var(DATABASE_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.database {
            return path.clone();
        }
        PathBuf::from(DEFAULT_DATABASE)
    }

    /// Builds the store settings for the resolved database
    pub fn store_config(&self, explicit: Option<&Path>) -> StoreConfig {
        StoreConfig {
            path: self.resolve_database_path(explicit),
            busy_timeout_ms: self.busy_timeout_ms,
            wal_mode: self.wal_mode,
        }
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if GARAGE_CONFIG_PATH environment variable is set
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.garage.config
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".garage.config"))
}
