//! Store configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CRAWLSTORE_*)
//! 2. TOML config file (if CRAWLSTORE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Document store configuration.
///
/// Supplied once when the store is opened; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    ///
    /// Set via CRAWLSTORE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Upper bound for a single store operation, in milliseconds.
    ///
    /// Set via CRAWLSTORE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long SQLite waits on a locked database before giving up.
    ///
    /// When unset, 5 seconds capped at `timeout_ms`. An explicit value
    /// larger than `timeout_ms` is rejected.
    ///
    /// Set via CRAWLSTORE_BUSY_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,

    /// Default revisit interval used when a caller does not pass one.
    ///
    /// Set via CRAWLSTORE_REVISIT_INTERVAL_DAYS environment variable.
    #[serde(default = "default_revisit_interval_days")]
    pub revisit_interval_days: u32,

    /// Default cap on the visited-URL listing.
    ///
    /// Set via CRAWLSTORE_VISITED_LIMIT environment variable.
    #[serde(default = "default_visited_limit")]
    pub visited_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./crawlstore.sqlite")
}

fn default_timeout_ms() -> u64 {
    10_000
}

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_revisit_interval_days() -> u32 {
    7
}

fn default_visited_limit() -> usize {
    crate::store::DEFAULT_VISITED_LIMIT
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            timeout_ms: default_timeout_ms(),
            busy_timeout_ms: None,
            revisit_interval_days: default_revisit_interval_days(),
            visited_limit: default_visited_limit(),
        }
    }
}

impl StoreConfig {
    /// Per-operation timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// SQLite busy timeout as a Duration, with the default applied.
    pub fn busy_timeout(&self) -> Duration {
        let millis = self
            .busy_timeout_ms
            .unwrap_or_else(|| DEFAULT_BUSY_TIMEOUT_MS.min(self.timeout_ms));
        Duration::from_millis(millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CRAWLSTORE_`
    /// 2. TOML file from `CRAWLSTORE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CRAWLSTORE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("CRAWLSTORE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
