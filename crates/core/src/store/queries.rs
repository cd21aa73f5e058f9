//! Read-only queries for the scheduler: stale documents, visited keys
//! and progress counters.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use super::connection::DocumentStore;
use super::documents::{DOCUMENT_COLUMNS, DocumentStatus, StoredDocument, row_to_document};
use crate::Error;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Default cap for [`DocumentStore::visited_urls`].
pub const DEFAULT_VISITED_LIMIT: usize = 10_000;

/// Crawl progress counters.
///
/// `pending` is everything that is not `processed`, unknown statuses
/// included, so `total == processed + pending` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Statistics {
    pub total: u64,
    pub processed: u64,
    pub pending: u64,
}

/// Oldest `updated_at` that still counts as fresh at `now`.
pub fn revisit_cutoff(interval_days: u32, now: i64) -> i64 {
    now.saturating_sub(i64::from(interval_days) * SECONDS_PER_DAY)
}

impl DocumentStore {
    /// Documents not written within the last `interval_days` days.
    pub async fn documents_for_revisit(&self, interval_days: u32) -> Result<Vec<StoredDocument>, Error> {
        self.documents_for_revisit_at(interval_days, chrono::Utc::now().timestamp())
            .await
    }

    /// Documents whose `updated_at` is strictly before `now - interval_days` days.
    ///
    /// Returns a complete snapshot, oldest first.
    pub async fn documents_for_revisit_at(&self, interval_days: u32, now: i64) -> Result<Vec<StoredDocument>, Error> {
        let cutoff = revisit_cutoff(interval_days, now);
        let documents = self
            .call("documents_for_revisit", "", move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE updated_at < ?1 ORDER BY updated_at ASC"
                ))?;
                let rows = stmt.query_map(params![cutoff], row_to_document)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;

        tracing::debug!(interval_days, cutoff, count = documents.len(), "revisit candidates loaded");
        Ok(documents)
    }

    /// Up to `limit` stored keys, in no particular order.
    ///
    /// Truncation is silent; use [`DocumentStore::statistics`] to learn the
    /// full count.
    pub async fn visited_urls(&self, limit: usize) -> Result<Vec<String>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.call("visited_urls", "", move |conn| {
            let mut stmt = conn.prepare("SELECT normalized_url FROM documents LIMIT ?1")?;
            let rows = stmt.query_map(params![limit], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Count documents by processing state.
    pub async fn statistics(&self) -> Result<Statistics, Error> {
        let (total, processed) = self
            .call("statistics", "", |conn| {
                conn.query_row(
                    "SELECT
                        (SELECT COUNT(*) FROM documents),
                        (SELECT COUNT(*) FROM documents WHERE status = ?1)",
                    params![DocumentStatus::PROCESSED],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
            })
            .await?;

        let total = total.max(0) as u64;
        let processed = processed.max(0) as u64;
        Ok(Statistics { total, processed, pending: total.saturating_sub(processed) })
    }
}
