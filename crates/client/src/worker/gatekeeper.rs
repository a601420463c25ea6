//! Per-request routing between network and cache.
//!
//! ### Policies
//! - **Excluded prefix**: network only, result returned verbatim, failure
//!   propagated. The store is never opened, read or written.
//! - **Network first**: live response wins; GET + 2xx responses are copied
//!   into the store in the background. On network failure, any store that
//!   holds the request answers, otherwise the outcome is empty.
//! - **Stale while revalidate**: a stored copy is returned at once while a
//!   background fetch refreshes it (status 200 only). Without a stored copy
//!   the fetch is awaited; if it fails a synthetic 503 is returned.

use std::future::Future;
use std::sync::Arc;

use shellcache_core::{CacheStorage, CachedResponse, Error, Request, Strategy};

use super::background::Background;
use crate::fetch::{Network, content_type};

/// Header marking the synthetic offline response.
pub const OFFLINE_HEADER: &str = "x-shellcache-offline";

/// Where the answer to an intercepted request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// Live network response.
    Network(CachedResponse),
    /// Stored copy.
    Cache(CachedResponse),
    /// Synthetic 503: no stored copy and the network failed.
    Offline(CachedResponse),
    /// No response at all (network-first miss while offline).
    Empty,
}

impl Served {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Served::Network(r) | Served::Cache(r) | Served::Offline(r) => Some(r),
            Served::Empty => None,
        }
    }

    pub fn into_response(self) -> Option<CachedResponse> {
        match self {
            Served::Network(r) | Served::Cache(r) | Served::Offline(r) => Some(r),
            Served::Empty => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Served::Network(_) => "network",
            Served::Cache(_) => "cache",
            Served::Offline(_) => "offline",
            Served::Empty => "empty",
        }
    }
}

fn offline_response(request: &Request) -> CachedResponse {
    CachedResponse::new(&request.url, 503, "offline")
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_header(OFFLINE_HEADER, "1")
}

/// Routes intercepted requests for one store version.
#[derive(Clone)]
pub struct Gatekeeper {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    background: Background,
    store: String,
    excluded_prefix: String,
    strategy: Strategy,
}

impl Gatekeeper {
    pub fn new(
        storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, background: Background, store: String,
        excluded_prefix: String, strategy: Strategy,
    ) -> Self {
        Self { storage, network, background, store, excluded_prefix, strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn is_excluded(&self, request: &Request) -> bool {
        request.url.starts_with(&self.excluded_prefix)
    }

    /// Produce the answer for one intercepted request.
    ///
    /// # Errors
    ///
    /// Network errors surface only for excluded requests; storage errors
    /// surface where a cache read decides the answer.
    pub async fn route(&self, request: Request) -> Result<Served, Error> {
        if self.is_excluded(&request) {
            tracing::debug!(url = %request.url, "excluded from cache, going to network");
            return self.network.fetch(&request).await.map(Served::Network);
        }

        match self.strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn network_first(&self, request: Request) -> Result<Served, Error> {
        match self.network.fetch(&request).await {
            Ok(response) => {
                match self.storage.open_store(&self.store).await {
                    Ok(_) if request.is_get() && response.is_ok() => {
                        self.store_in_background(request, response.clone());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(store = %self.store, "could not open cache store: {e}"),
                }
                Ok(Served::Network(response))
            }
            Err(err) => {
                tracing::info!(url = %request.url, "network failed, serving from cache: {err}");
                Ok(match self.storage.match_any(&request).await? {
                    Some(cached) => Served::Cache(cached),
                    None => Served::Empty,
                })
            }
        }
    }

    async fn stale_while_revalidate(&self, request: Request) -> Result<Served, Error> {
        self.storage.open_store(&self.store).await?;
        let cached = self.storage.match_in(&self.store, &request).await?;

        match cached {
            Some(hit) => {
                tracing::debug!(url = %request.url, "cache hit, revalidating in background");
                let refresh = self.revalidate(request);
                self.background.spawn(async move {
                    refresh.await;
                });
                Ok(Served::Cache(hit))
            }
            None => {
                tracing::debug!(url = %request.url, "cache miss");
                let offline = offline_response(&request);
                Ok(match self.revalidate(request).await {
                    Some(response) => Served::Network(response),
                    None => Served::Offline(offline),
                })
            }
        }
    }

    /// Fetch from the network and schedule a store write for a 200 GET.
    ///
    /// Failures are swallowed: the caller decides what an absent response means.
    fn revalidate(&self, request: Request) -> impl Future<Output = Option<CachedResponse>> + Send + 'static {
        let this = self.clone();
        async move {
            match this.network.fetch(&request).await {
                Ok(response) => {
                    if request.is_get() && response.status == 200 {
                        this.store_in_background(request, response.clone());
                    }
                    Some(response)
                }
                Err(err) => {
                    tracing::debug!(url = %request.url, "revalidation failed: {err}");
                    None
                }
            }
        }
    }

    fn store_in_background(&self, request: Request, response: CachedResponse) {
        let storage = Arc::clone(&self.storage);
        let store = self.store.clone();
        self.background.spawn(async move {
            match storage.put(&store, &request, &response).await {
                Ok(()) => tracing::debug!(
                    url = %request.url,
                    status = response.status,
                    content_type = content_type(&response),
                    "stored response"
                ),
                Err(e) => tracing::warn!(url = %request.url, "failed to store response: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{CountingStorage, Reply, StubNetwork};
    use std::time::Duration;

    const EXEC: &str = "https://script.google.com/macros/s/abc/exec";
    const INDEX: &str = "http://localhost/index.html";

    struct Fixture {
        storage: Arc<CountingStorage>,
        network: Arc<StubNetwork>,
        background: Background,
        gatekeeper: Gatekeeper,
    }

    async fn fixture(strategy: Strategy) -> Fixture {
        let storage = Arc::new(CountingStorage::new().await);
        let network = Arc::new(StubNetwork::new());
        let background = Background::new();
        let gatekeeper = Gatekeeper::new(
            storage.clone(),
            network.clone(),
            background.clone(),
            "v1".to_string(),
            "https://script.google.com/macros/".to_string(),
            strategy,
        );
        storage.inner.open_store("v1").await.unwrap();
        Fixture { storage, network, background, gatekeeper }
    }

    async fn seed(f: &Fixture, url: &str, body: &str) {
        f.storage
            .inner
            .put("v1", &Request::get(url), &CachedResponse::new(url, 200, body))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_excluded_never_touches_storage() {
        for strategy in [Strategy::NetworkFirst, Strategy::StaleWhileRevalidate] {
            let f = fixture(strategy).await;
            f.network.respond(EXEC, 200, "{\"ok\":true}");

            let served = f.gatekeeper.route(Request::get(EXEC)).await.unwrap();
            f.background.settle().await;

            assert_eq!(served.source(), "network");
            assert_eq!(f.storage.calls(), 0);
            assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_excluded_failure_propagates() {
        let f = fixture(Strategy::NetworkFirst).await;
        f.network.reply(EXEC, Reply::Fail);

        let result = f.gatekeeper.route(Request::new("POST", EXEC).with_body("score=90")).await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(f.storage.calls(), 0);
        assert!(f.storage.inner.match_any(&Request::get(EXEC)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_first_stores_ok_get() {
        let f = fixture(Strategy::NetworkFirst).await;
        f.network.respond(INDEX, 200, "<h1>live</h1>");

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(served, Served::Network(CachedResponse::new(INDEX, 200, "<h1>live</h1>")));
        let stored = f.storage.inner.match_in("v1", &Request::get(INDEX)).await.unwrap().unwrap();
        assert_eq!(stored.body, b"<h1>live</h1>");
    }

    #[tokio::test]
    async fn test_network_first_stores_any_2xx() {
        let f = fixture(Strategy::NetworkFirst).await;
        f.network.respond(INDEX, 204, "");

        f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_network_first_skips_errors_and_posts() {
        let f = fixture(Strategy::NetworkFirst).await;
        f.network.respond(INDEX, 500, "boom");
        f.network.respond("http://localhost/form", 200, "ok");

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.gatekeeper.route(Request::new("POST", "http://localhost/form")).await.unwrap();
        f.background.settle().await;

        assert_eq!(served.response().unwrap().status, 500);
        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let f = fixture(Strategy::NetworkFirst).await;
        seed(&f, INDEX, "<h1>cached</h1>").await;
        f.network.reply(INDEX, Reply::Fail);

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        assert_eq!(served.source(), "cache");
        assert_eq!(served.response().unwrap().body, b"<h1>cached</h1>");
    }

    #[tokio::test]
    async fn test_network_first_offline_miss_is_empty() {
        let f = fixture(Strategy::NetworkFirst).await;
        f.network.reply(INDEX, Reply::Fail);

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        assert_eq!(served, Served::Empty);
        assert!(served.response().is_none());
    }

    #[tokio::test]
    async fn test_swr_hit_returns_without_waiting_for_network() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        seed(&f, INDEX, "<h1>cached</h1>").await;
        f.network.reply(INDEX, Reply::Hang);

        let served = tokio::time::timeout(Duration::from_secs(1), f.gatekeeper.route(Request::get(INDEX)))
            .await
            .expect("cache hit must not wait on the network")
            .unwrap();

        assert_eq!(served, Served::Cache(CachedResponse::new(INDEX, 200, "<h1>cached</h1>")));
        assert_eq!(f.background.pending(), 1);
    }

    #[tokio::test]
    async fn test_swr_hit_survives_network_failure() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        seed(&f, INDEX, "<h1>cached</h1>").await;
        f.network.reply(INDEX, Reply::Fail);

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(served.source(), "cache");
        assert_eq!(served.response().unwrap().body, b"<h1>cached</h1>");
        assert_eq!(f.network.calls(), 1);
    }

    #[tokio::test]
    async fn test_swr_hit_refreshes_store() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        seed(&f, INDEX, "old").await;
        f.network.respond(INDEX, 200, "new");

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        assert_eq!(served.response().unwrap().body, b"old");

        f.background.settle().await;
        let stored = f.storage.inner.match_in("v1", &Request::get(INDEX)).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new");
    }

    #[tokio::test]
    async fn test_swr_miss_returns_network_and_stores() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        f.network.respond(INDEX, 200, "fresh");

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(served.source(), "network");
        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_swr_only_stores_exact_200() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        f.network.respond(INDEX, 204, "");

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(served.response().unwrap().status, 204);
        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_swr_miss_and_failure_is_offline() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        f.network.reply(INDEX, Reply::Fail);

        let served = f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        let response = served.response().unwrap();
        assert_eq!(served.source(), "offline");
        assert_eq!(response.status, 503);
        assert_eq!(response.header(OFFLINE_HEADER), Some("1"));
        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_swr_reopens_evicted_store() {
        let f = fixture(Strategy::StaleWhileRevalidate).await;
        f.storage.inner.delete_store("v1").await.unwrap();
        f.network.respond(INDEX, 200, "fresh");

        f.gatekeeper.route(Request::get(INDEX)).await.unwrap();
        f.background.settle().await;

        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_completed_writes_do_not_accumulate() {
        let f = fixture(Strategy::NetworkFirst).await;
        let urls: Vec<String> = (0..200).map(|i| format!("http://localhost/page/{i}")).collect();
        for url in &urls {
            f.network.respond(url, 200, "page");
        }

        for url in &urls {
            f.gatekeeper.route(Request::get(url.as_str())).await.unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            while f.background.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(f.background.pending(), 0);
        assert_eq!(f.storage.inner.entry_count("v1").await.unwrap(), 200);
    }
}
