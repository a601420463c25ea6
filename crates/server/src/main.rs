//! shellcache server entry point.
//!
//! Boots the worker against the configured cache database and serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig, ServiceWorker};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(app = %config.app_name, strategy = %config.strategy, db = %config.db_path.display(), "Starting shellcache server on stdio transport");

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(ServiceWorker::new(&config, storage, network)?);

    if config.skip_waiting {
        // A failed install leaves the worker redundant; tools still report it.
        match worker.install().await {
            Ok(_) => {
                worker.activate().await?;
            }
            Err(e) => tracing::warn!(error = %e, "install failed, worker is redundant"),
        }
    }

    let handler = handler::ShellCacheServer::new(worker);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
