//! crawlstore MCP server entry point.
//!
//! Opens the document store described by the environment and serves it on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use anyhow::Result;
use crawlstore_core::{DocumentStore, StoreConfig};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = StoreConfig::load()?;
    let store = DocumentStore::open(&config).await?;

    tracing::info!(db_path = %config.db_path.display(), "Starting crawlstore server on stdio transport");

    let handler = handler::CrawlStoreServer::new(store.clone(), &config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    store.close().await?;

    Ok(())
}
