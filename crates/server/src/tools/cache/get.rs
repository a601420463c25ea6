//! cache_get tool implementation.
//!
//! Looks up the stored response for a URL in the current store without
//! touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{ServiceWorker, fetch::resolve};
use shellcache_core::{CachedResponse, Error, Request};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the worker scope.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub response: CachedResponse,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ServiceWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(worker.scope(), &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let store = worker.version().to_string();

    let response = worker
        .storage()
        .match_in(&store, &Request::get(url.as_str()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&CacheGetOutput { store, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{parse, worker};
    use shellcache_core::Strategy;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (sw, _db, _net) = worker(Strategy::NetworkFirst).await;
        sw.install().await.unwrap();

        let err = get_impl(&sw, CacheGetParams { url: "/missing.css".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let (sw, _db, _net) = worker(Strategy::NetworkFirst).await;
        sw.install().await.unwrap();

        let output: CacheGetOutput = parse(&get_impl(&sw, CacheGetParams { url: "/".into() }).await.unwrap());
        assert_eq!(output.store, sw.version());
        assert_eq!(output.response.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_get_impl_bad_url() {
        let (sw, _db, _net) = worker(Strategy::NetworkFirst).await;
        let err = get_impl(&sw, CacheGetParams { url: "".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
