//! Worker lifecycle and fetch tools.
//!
//! `worker_install` and `worker_activate` fire the lifecycle hooks,
//! `worker_fetch` pushes one request through the gatekeeper, and
//! `worker_status` reports where the worker is.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{ServiceWorker, WorkerState};
use shellcache_core::{Request, Strategy};

use super::json_result;
use crate::error::ToolError;

/// Output of worker_status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub state: WorkerState,
    /// Name of the store this worker owns.
    pub version: String,
    pub strategy: Strategy,
    pub scope: String,
    pub seeds: Vec<String>,
}

/// Output of worker_install.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub version: String,
    /// Number of seed assets written to the store.
    pub seeded: usize,
}

/// Output of worker_activate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub version: String,
    /// Stale stores that were deleted.
    pub evicted: Vec<String>,
}

/// Input parameters for worker_fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the worker scope.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body, sent as UTF-8.
    #[serde(default)]
    pub body: Option<String>,

    /// Optional request headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Wait for background cache writes before returning.
    #[serde(default)]
    pub settle: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output of worker_fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// One of "network", "cache", "offline", "empty".
    pub source: String,
    pub status: Option<u16>,
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let output = WorkerStatusOutput {
        state: worker.state().await,
        version: worker.version().to_string(),
        strategy: worker.strategy(),
        scope: worker.scope().to_string(),
        seeds: worker.seeds().iter().map(|u| u.to_string()).collect(),
    };
    json_result(&output)
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let seeded = worker.install().await?;
    json_result(&WorkerInstallOutput { version: worker.version().to_string(), seeded })
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let evicted = worker.activate().await?;
    json_result(&WorkerActivateOutput { version: worker.version().to_string(), evicted })
}

pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.is_empty() || !params.method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {:?}", params.method)).into());
    }

    let mut request = Request::new(&params.method, params.url);
    request.headers = params.headers;
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let served = worker.handle_fetch(request).await?;
    if params.settle {
        worker.settle().await;
    }

    let source = served.source().to_string();
    let output = match served.into_response() {
        Some(response) => WorkerFetchOutput {
            source,
            status: Some(response.status),
            url: Some(response.url),
            body: Some(String::from_utf8_lossy(&response.body).into_owned()),
            headers: response.headers,
        },
        None => WorkerFetchOutput { source, status: None, url: None, headers: Vec::new(), body: None },
    };

    json_result(&output)
}
