//! document_get tool implementation.
//!
//! Retrieves a stored document by URL.

use crawlstore_core::{DocumentStore, Error, StoredDocument, normalize};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the document_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentGetParams {
    /// URL of the document. Query and fragment are ignored.
    pub url: String,
}

/// Output from the document_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentGetOutput {
    /// The stored document.
    pub document: StoredDocument,
}

/// Implementation of the document_get tool.
pub async fn get_impl(store: &DocumentStore, params: DocumentGetParams) -> Result<CallToolResult, McpError> {
    let key = normalize(&params.url);
    let document = store
        .get(key)
        .await?
        .ok_or_else(|| Error::NotFound(key.to_string()))?;

    json_result(&DocumentGetOutput { document })
}
