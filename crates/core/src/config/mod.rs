//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::hash::compute_version;

mod validation;

pub use validation::ConfigError;

/// Routing policy for requests outside the excluded prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Try the network, fall back to any cached copy when it fails.
    NetworkFirst,
    /// Serve the cached copy immediately and refresh it in the background.
    #[default]
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name; prefix of the computed store version.
    ///
    /// Set via SHELLCACHE_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Origin and path the worker controls; relative URLs resolve against it.
    ///
    /// Set via SHELLCACHE_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// Assets fetched and stored during install.
    ///
    /// Set via SHELLCACHE_SEED_ASSETS environment variable (TOML array).
    #[serde(default = "default_seed_assets")]
    pub seed_assets: Vec<String>,

    /// URL prefix that always goes to the network and is never cached.
    ///
    /// Set via SHELLCACHE_EXCLUDED_PREFIX environment variable.
    #[serde(default = "default_excluded_prefix")]
    pub excluded_prefix: String,

    /// Routing strategy for cacheable requests.
    ///
    /// Set via SHELLCACHE_STRATEGY environment variable.
    #[serde(default)]
    pub strategy: Strategy,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body bytes accepted from the network.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Install and activate at startup without waiting for a client.
    ///
    /// Set via SHELLCACHE_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,
}

fn default_app_name() -> String {
    "student-score-app".into()
}

fn default_scope_url() -> String {
    "http://localhost:8080/".into()
}

fn default_seed_assets() -> Vec<String> {
    vec![
        "/".into(),
        "https://fonts.googleapis.com/css2?family=Khmer+OS+Battambang&family=Khmer+OS+Muol+Light&display=swap".into(),
    ]
}

fn default_excluded_prefix() -> String {
    "https://script.google.com/macros/s/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            scope_url: default_scope_url(),
            seed_assets: default_seed_assets(),
            excluded_prefix: default_excluded_prefix(),
            strategy: Strategy::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            skip_waiting: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache store.
    ///
    /// Derived from the content that shapes the cache, so it never needs a
    /// manual bump.
    pub fn cache_version(&self) -> String {
        compute_version(&self.app_name, self.strategy.as_str(), &self.excluded_prefix, &self.seed_assets)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
