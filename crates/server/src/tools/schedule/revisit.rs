//! documents_for_revisit tool implementation.
//!
//! Lists documents that have not been written within the revisit interval.

use crawlstore_core::{DocumentStore, StoredDocument};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the documents_for_revisit tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RevisitParams {
    /// Revisit interval in days. Defaults to the configured interval.
    #[serde(default)]
    pub interval_days: Option<u32>,
}

/// Output from the documents_for_revisit tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RevisitOutput {
    /// Interval the query ran with.
    pub interval_days: u32,
    /// Number of stale documents.
    pub count: usize,
    /// Stale documents, oldest first.
    pub documents: Vec<StoredDocument>,
}

/// Implementation of the documents_for_revisit tool.
pub async fn revisit_impl(
    store: &DocumentStore, params: RevisitParams, default_interval_days: u32,
) -> Result<CallToolResult, McpError> {
    let interval_days = params.interval_days.unwrap_or(default_interval_days);
    let documents = store.documents_for_revisit(interval_days).await?;

    json_result(&RevisitOutput { interval_days, count: documents.len(), documents })
}
