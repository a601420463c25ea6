//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_name`, `excluded_prefix` or `user_agent` is empty
    /// - `scope_url` is not an http(s) URL
    /// - a seed asset does not resolve against `scope_url` to an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(invalid("app_name", "must not be empty"));
        }

        let scope = Url::parse(&self.scope_url).map_err(|e| invalid("scope_url", e.to_string()))?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(invalid("scope_url", format!("unsupported scheme: {}", scope.scheme())));
        }

        let mut seen = HashSet::new();
        for seed in &self.seed_assets {
            let resolved = scope
                .join(seed)
                .map_err(|e| invalid("seed_assets", format!("{seed}: {e}")))?;
            if !matches!(resolved.scheme(), "http" | "https") {
                return Err(invalid("seed_assets", format!("{seed}: unsupported scheme")));
            }
            if !seen.insert(resolved) {
                tracing::warn!(seed = %seed, "duplicate seed asset; it will be fetched twice");
            }
        }

        if self.excluded_prefix.is_empty() {
            return Err(invalid("excluded_prefix", "must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
