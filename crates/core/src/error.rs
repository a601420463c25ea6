//! Unified error types for shellcache.
//!
//! Every variant carries a stable code prefix so failures read the same in
//! logs and in MCP error payloads.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the shellcache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., caching a non-GET request).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// No cache entry for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Named cache store does not exist (never opened, or evicted).
    #[error("STORE_NOT_FOUND: {0}")]
    StoreNotFound(String),

    /// Network transport failure (connection refused, DNS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A seed asset could not be fetched during install.
    #[error("SEED_FAILED: {url}: {reason}")]
    SeedFailed { url: String, reason: String },

    /// Lifecycle hook called in the wrong worker state.
    #[error("INVALID_STATE: expected {expected}, worker is {actual}")]
    InvalidState { expected: String, actual: String },
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed stored headers: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::CacheMiss(_) => -32001,
            Error::StoreNotFound(_) => -32004,
            Error::Network(_) => -32008,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::SeedFailed { .. } => -32013,
            Error::InvalidState { .. } => -32014,
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
