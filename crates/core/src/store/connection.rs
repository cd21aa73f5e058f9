//! Store handle lifecycle and pragma configuration.
//!
//! This module opens the SQLite database, applies the pragmas needed for
//! several writers sharing one file (WAL mode, busy timeout), runs
//! migrations, and funnels every later operation through one timed call
//! path so closed handles and stalls surface as typed errors.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio_rusqlite::{Connection, rusqlite};

use super::migrations;
use crate::Error;
use crate::config::StoreConfig;

/// Handle to an open document store.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Clones share that connection; `close` on any clone
/// closes it for all of them.
#[derive(Clone)]
pub struct DocumentStore {
    pub(crate) conn: Connection,
    interrupt: Arc<rusqlite::InterruptHandle>,
    closed: Arc<AtomicBool>,
    timeout: Duration,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("conn", &self.conn)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// Progress of one queued call, shared between the caller and the connection thread.
const CALL_QUEUED: u8 = 0;
const CALL_RUNNING: u8 = 1;
const CALL_DONE: u8 = 2;
const CALL_CANCELLED: u8 = 3;

impl DocumentStore {
    /// Open the store described by `config`.
    ///
    /// Creates the database file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(config: &StoreConfig) -> Result<Self, Error> {
        let path = config.db_path.clone();
        let conn = Connection::open(&path)
            .await
            .map_err(|e| Error::Connection(format!("{}: {e}", path.display())))?;

        let store = Self::configure(conn, config).await?;
        tracing::info!(db_path = %path.display(), "document store opened");
        Ok(store)
    }

    /// Open the store at `path` with otherwise default settings.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config = StoreConfig { db_path: path.as_ref().to_path_buf(), ..Default::default() };
        Self::open(&config).await
    }

    /// Open an in-memory store for testing.
    ///
    /// Every call yields an independent, empty database.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Connection(format!("in-memory database: {e}")))?;

        Self::configure(conn, &StoreConfig::default()).await
    }

    async fn configure(conn: Connection, config: &StoreConfig) -> Result<Self, Error> {
        let busy_timeout = config.busy_timeout();
        let interrupt = conn
            .call(move |conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode=WAL;
                     PRAGMA synchronous=NORMAL;
                     PRAGMA temp_store=MEMORY;",
                )?;
                conn.busy_timeout(busy_timeout)?;
                Ok(conn.get_interrupt_handle())
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| Error::Connection(e.to_string()))?;

        migrations::run(&conn).await?;

        Ok(Self {
            conn,
            interrupt: Arc::new(interrupt),
            closed: Arc::new(AtomicBool::new(false)),
            timeout: config.timeout(),
        })
    }

    /// Release the underlying connection.
    ///
    /// Any operation issued afterwards, through this handle or a clone,
    /// fails with `Error::Closed`. Closing an already closed store does too.
    pub async fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed);
        }

        match self.conn.clone().close().await {
            Ok(()) => {
                tracing::info!("document store closed");
                Ok(())
            }
            Err(tokio_rusqlite::Error::ConnectionClosed) => Err(Error::Closed),
            Err(error) => Err(Error::Storage { op: "close", key: String::new(), error }),
        }
    }

    /// Run `function` on the connection thread, bounded by the configured timeout.
    ///
    /// `op` and `key` end up in the error so callers can log and decide on
    /// retries without extra bookkeeping. A call that times out writes
    /// nothing: if it is still queued it is skipped, if it is running its
    /// statement is interrupted and rolled back.
    pub(crate) async fn call<F, R>(&self, op: &'static str, key: &str, function: F) -> Result<R, Error>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        let state = Arc::new(AtomicU8::new(CALL_QUEUED));
        let worker_state = Arc::clone(&state);
        let guarded = move |conn: &mut rusqlite::Connection| {
            if worker_state
                .compare_exchange(CALL_QUEUED, CALL_RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(interrupted());
            }
            let result = function(conn);
            worker_state.store(CALL_DONE, Ordering::Release);
            result
        };

        match tokio::time::timeout(self.timeout, self.conn.call(guarded)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(tokio_rusqlite::Error::ConnectionClosed)) => Err(Error::Closed),
            Ok(Err(error)) => Err(Error::Storage { op, key: key.to_string(), error }),
            Err(_) => {
                if let Err(CALL_RUNNING) =
                    state.compare_exchange(CALL_QUEUED, CALL_CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                {
                    self.interrupt.interrupt();
                }
                tracing::warn!(op, key, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(Error::Timeout { op, timeout_ms: self.timeout.as_millis() as u64 })
            }
        }
    }
}

fn interrupted() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT), None)
}
