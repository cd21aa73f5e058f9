//! Configuration validation rules.
//!
//! This module provides validation logic for `StoreConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::StoreConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl StoreConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db_path` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `busy_timeout_ms` is set and exceeds `timeout_ms`
    /// - `revisit_interval_days` or `visited_limit` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "db_path".into(), reason: "must not be empty".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.busy_timeout_ms.is_some_and(|busy| busy > self.timeout_ms) {
            return Err(ConfigError::Invalid {
                field: "busy_timeout_ms".into(),
                reason: "must not exceed timeout_ms".into(),
            });
        }

        if self.revisit_interval_days == 0 {
            return Err(ConfigError::Invalid {
                field: "revisit_interval_days".into(),
                reason: "must be at least 1 day".into(),
            });
        }

        if self.visited_limit == 0 {
            return Err(ConfigError::Invalid { field: "visited_limit".into(), reason: "must be greater than 0".into() });
        }

        if self.busy_timeout().is_zero() {
            tracing::warn!("busy_timeout_ms is 0; concurrent writers will fail immediately on a locked database");
        }

        Ok(())
    }
}
