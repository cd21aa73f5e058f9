//! Core types and storage for crawlstore.
//!
//! This crate provides:
//! - The document store with SQLite backend
//! - URL normalization and content fingerprints
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use error::Error;
pub use store::{Document, DocumentStatus, DocumentStore, SaveOutcome, Statistics, StoredDocument};
pub use store::{fingerprint, normalize};
