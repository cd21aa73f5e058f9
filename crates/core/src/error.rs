//! Unified error types for crawlstore.
//!
//! Every variant renders with a stable code prefix so callers and MCP
//! clients can match on it without parsing free text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the document store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The database could not be opened or configured.
    #[error("CONNECTION_ERROR: {0}")]
    Connection(String),

    /// The store handle was closed before the operation ran.
    #[error("STORE_CLOSED")]
    Closed,

    /// The operation did not finish within the configured bound.
    #[error("STORE_TIMEOUT: {op} exceeded {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    /// Any other storage engine failure, tagged with the operation and key.
    #[error("STORE_ERROR: {op} [{key}]: {error}")]
    Storage { op: &'static str, key: String, error: tokio_rusqlite::Error },

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No document stored under the given key.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Storage { error: tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(e, _)), .. } => {
                matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::NotFound(_) => -32001,
            Error::Storage { .. } | Error::MigrationFailed(_) => -32002,
            Error::Connection(_) => -32003,
            Error::Closed => -32004,
            Error::Timeout { .. } => -32005,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
