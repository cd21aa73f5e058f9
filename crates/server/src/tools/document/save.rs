//! document_save tool implementation.
//!
//! Stores a crawled document, creating or updating it by normalized URL.

use crawlstore_core::{Document, DocumentStore, Error, SaveOutcome, normalize};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the document_save tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSaveParams {
    /// The document to store. `url` is accepted in place of `normalized_url`.
    #[serde(flatten)]
    pub document: Document,

    /// Fill `content_hash` from `clean_text` before saving.
    #[serde(default)]
    pub hash_content: bool,

    /// Only insert; report `duplicate` instead of touching an existing document.
    #[serde(default)]
    pub insert_only: bool,
}

/// Output from the document_save tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSaveOutput {
    /// Key the document is stored under.
    pub normalized_url: String,
    /// What the write did.
    #[serde(flatten)]
    pub outcome: SaveOutcome,
}

/// Implementation of the document_save tool.
pub async fn save_impl(store: &DocumentStore, params: DocumentSaveParams) -> Result<CallToolResult, McpError> {
    let normalized_url = normalize(&params.document.normalized_url).to_string();
    if normalized_url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let document = if params.hash_content { params.document.with_fingerprint() } else { params.document };

    let outcome = if params.insert_only { store.insert(&document).await? } else { store.save(&document).await? };

    json_result(&DocumentSaveOutput { normalized_url, outcome })
}
