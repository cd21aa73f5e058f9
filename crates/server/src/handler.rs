//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the document store.
use crate::tools::document::{DocumentGetParams, DocumentSaveParams, get_impl, save_impl};
use crate::tools::schedule::{RevisitParams, VisitedParams, revisit_impl, statistics_impl, visited_impl};

use crawlstore_core::{DocumentStore, StoreConfig};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for crawlstore.
#[derive(Clone)]
pub struct CrawlStoreServer {
    store: DocumentStore,
    revisit_interval_days: u32,
    visited_limit: usize,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CrawlStoreServer {
    /// Create a new server handler over an open store.
    pub fn new(store: DocumentStore, config: &StoreConfig) -> Self {
        Self {
            store,
            revisit_interval_days: config.revisit_interval_days,
            visited_limit: config.visited_limit,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Get a stored crawl document by URL. Query string and fragment are ignored.")]
    async fn document_get(&self, params: Parameters<DocumentGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.store, params.0).await
    }

    /// Store a crawled document.
    ///
    /// Creates it on first sight of its normalized URL, otherwise rewrites it in place.
    #[tool(
        description = "Store a crawled document keyed by normalized URL. Reports created, updated, unchanged or duplicate."
    )]
    async fn document_save(&self, params: Parameters<DocumentSaveParams>) -> Result<CallToolResult, McpError> {
        save_impl(&self.store, params.0).await
    }

    #[tool(description = "List documents not updated within the revisit interval (days), oldest first.")]
    async fn documents_for_revisit(&self, params: Parameters<RevisitParams>) -> Result<CallToolResult, McpError> {
        revisit_impl(&self.store, params.0, self.revisit_interval_days).await
    }

    #[tool(description = "List up to `limit` visited URLs for resuming a crawl. Truncation is silent.")]
    async fn visited_urls(&self, params: Parameters<VisitedParams>) -> Result<CallToolResult, McpError> {
        visited_impl(&self.store, params.0, self.visited_limit).await
    }

    #[tool(description = "Count stored documents: total, processed and pending.")]
    async fn statistics(&self) -> Result<CallToolResult, McpError> {
        statistics_impl(&self.store).await
    }
}

impl ServerHandler for CrawlStoreServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "crawlstore".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
