//! SQLite-backed store for crawled documents.
//!
//! This module provides the persistence layer between the crawler and the
//! scheduler, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Deduplication by normalized URL, enforced by a unique index
//! - Change detection through caller-supplied content fingerprints
//! - Staleness queries for revisit scheduling
//! - Automatic schema migrations
//! - WAL mode so several handles can share one database file

pub mod connection;
pub mod documents;
pub mod hash;
pub mod migrations;
pub mod queries;
pub mod url;

pub use crate::Error;

pub use connection::DocumentStore;
pub use documents::{Document, DocumentStatus, SaveOutcome, StoredDocument};
pub use hash::fingerprint;
pub use queries::{DEFAULT_VISITED_LIMIT, SECONDS_PER_DAY, Statistics};
pub use url::normalize;
