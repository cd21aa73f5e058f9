//! visited_urls tool implementation.
//!
//! Lists stored keys so an interrupted crawl can resume.

use crawlstore_core::DocumentStore;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the visited_urls tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VisitedParams {
    /// Maximum number of URLs to return. Defaults to the configured limit.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Output from the visited_urls tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisitedOutput {
    /// Normalized URLs, in no particular order. May be truncated.
    pub urls: Vec<String>,
}

/// Implementation of the visited_urls tool.
pub async fn visited_impl(
    store: &DocumentStore, params: VisitedParams, default_limit: usize,
) -> Result<CallToolResult, McpError> {
    let urls = store.visited_urls(params.limit.unwrap_or(default_limit)).await?;

    json_result(&VisitedOutput { urls })
}
