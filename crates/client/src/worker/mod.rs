//! Offline caching worker: lifecycle hooks around the gatekeeper.
//!
//! ### Lifecycle
//! `Parsed → Installing → Installed → Activating → Activated`. A failed
//! install or activation leaves the worker `Redundant`.
//!
//! - **install** opens the versioned store and seeds it; it may be repeated
//!   while `Installed` and re-seeds the same store.
//! - **activate** evicts every other store before the worker starts
//!   answering requests, so only one version is ever readable.
//! - **handle_fetch** is only accepted once `Activated`.
//!
//! Background cache writes outlive the request that started them;
//! [`ServiceWorker::settle`] waits for them.

pub mod background;
pub mod gatekeeper;
pub mod janitor;
pub mod provision;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellcache_core::{AppConfig, CacheStorage, Error, Request, Strategy};
use tokio::sync::{Mutex, RwLock};
use url::Url;

pub use background::Background;
pub use gatekeeper::{Gatekeeper, OFFLINE_HEADER, Served};

use crate::fetch::{Network, resolve};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

fn invalid_state(expected: &str, actual: WorkerState) -> Error {
    Error::InvalidState { expected: expected.to_string(), actual: actual.to_string() }
}

/// The caching worker for one configuration.
pub struct ServiceWorker {
    scope: Url,
    seeds: Vec<Url>,
    version: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    gatekeeper: Gatekeeper,
    background: Background,
    state: RwLock<WorkerState>,
    lifecycle: Mutex<()>,
}

impl ServiceWorker {
    /// Build a worker from configuration.
    ///
    /// The store version is derived from the configuration; seeds are
    /// resolved against the scope URL up front.
    pub fn new(config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let scope = Url::parse(&config.scope_url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.scope_url)))?;
        let seeds = config
            .seed_assets
            .iter()
            .map(|seed| resolve(&scope, seed).map_err(|e| Error::InvalidUrl(format!("{seed}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        // Request URLs are canonicalized before matching, so the prefix must be too.
        let excluded_prefix = resolve(&scope, &config.excluded_prefix)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.excluded_prefix)))?
            .to_string();

        let version = config.cache_version();
        let background = Background::new();
        let gatekeeper = Gatekeeper::new(
            Arc::clone(&storage),
            Arc::clone(&network),
            background.clone(),
            version.clone(),
            excluded_prefix,
            config.strategy,
        );

        Ok(Self {
            scope,
            seeds,
            version,
            storage,
            network,
            gatekeeper,
            background,
            state: RwLock::new(WorkerState::Parsed),
            lifecycle: Mutex::new(()),
        })
    }

    /// Name of the store this worker owns.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn strategy(&self) -> Strategy {
        self.gatekeeper.strategy()
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn seeds(&self) -> &[Url] {
        &self.seeds
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        let from = *state;
        tracing::info!(version = %self.version, %from, to = %next, "worker state change");
        *state = next;
    }

    /// Install hook: open the versioned store and seed it.
    ///
    /// Returns the number of seeded entries.
    pub async fn install(&self) -> Result<usize, Error> {
        let _guard = self.lifecycle.lock().await;
        let current = self.state().await;
        if !matches!(current, WorkerState::Parsed | WorkerState::Installed) {
            return Err(invalid_state("parsed or installed", current));
        }

        tracing::info!(version = %self.version, "installing");
        self.set_state(WorkerState::Installing).await;

        match provision::provision(self.storage.as_ref(), self.network.as_ref(), &self.version, &self.seeds).await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(version = %self.version, "install failed: {e}");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Activate hook: evict stale stores, then start controlling requests.
    ///
    /// Returns the names of the evicted stores.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let _guard = self.lifecycle.lock().await;
        let current = self.state().await;
        if current != WorkerState::Installed {
            return Err(invalid_state("installed", current));
        }

        tracing::info!(version = %self.version, "activating");
        self.set_state(WorkerState::Activating).await;

        match janitor::evict_stale(self.storage.as_ref(), &self.version).await {
            Ok(evicted) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(version = %self.version, evicted = evicted.len(), "claiming clients");
                Ok(evicted)
            }
            Err(e) => {
                tracing::warn!(version = %self.version, "activation failed: {e}");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Intercept hook: canonicalize the request URL and route it.
    pub async fn handle_fetch(&self, request: Request) -> Result<Served, Error> {
        let current = self.state().await;
        if current != WorkerState::Activated {
            return Err(invalid_state("activated", current));
        }

        let url = resolve(&self.scope, &request.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?;
        let request = Request { url: url.to_string(), ..request };
        self.gatekeeper.route(request).await
    }

    /// Wait until every background cache write has finished.
    pub async fn settle(&self) -> usize {
        self.background.settle().await
    }
}
