//! cache_stores tool implementation.
//!
//! Lists every cache store with its entry count and marks the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::ServiceWorker;

use crate::tools::json_result;

/// One store in the cache_stores output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// Whether this store belongs to the running worker.
    pub current: bool,
    pub urls: Vec<String>,
}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let storage = worker.storage();
    let mut stores = Vec::new();
    for info in storage.store_infos().await? {
        let urls = storage.entry_urls(&info.name).await?;
        stores.push(StoreSummary {
            current: info.name == worker.version(),
            name: info.name,
            created_at: info.created_at,
            entries: info.entries,
            urls,
        });
    }

    json_result(&CacheStoresOutput { stores })
}
