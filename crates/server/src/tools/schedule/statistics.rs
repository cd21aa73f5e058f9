//! statistics tool implementation.

use crawlstore_core::DocumentStore;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use crate::tools::json_result;

/// Implementation of the statistics tool.
pub async fn statistics_impl(store: &DocumentStore) -> Result<CallToolResult, McpError> {
    let statistics = store.statistics().await?;
    json_result(&statistics)
}
