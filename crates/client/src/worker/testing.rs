//! Scripted transport and observable storage for worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shellcache_core::cache::StoreInfo;
use shellcache_core::{CacheDb, CacheStorage, CachedResponse, Error, Request};

use crate::fetch::Network;

/// What the stub network does for a URL.
#[derive(Clone)]
pub enum Reply {
    Respond(CachedResponse),
    Fail,
    Hang,
}

/// Network whose replies are scripted per URL. Unscripted URLs fail.
#[derive(Default)]
pub struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.reply(url, Reply::Respond(CachedResponse::new(url, status, body)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().get(&request.url).cloned();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail) | None => Err(Error::Network(format!("unreachable: {}", request.url))),
        }
    }
}

/// CacheDb wrapper counting every storage call.
pub struct CountingStorage {
    pub inner: CacheDb,
    calls: AtomicUsize,
}

impl CountingStorage {
    pub async fn new() -> Self {
        Self { inner: CacheDb::open_in_memory().await.unwrap(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open_store(&self, name: &str) -> Result<bool, Error> {
        self.tick();
        self.inner.open_store(name).await
    }

    async fn store_infos(&self) -> Result<Vec<StoreInfo>, Error> {
        self.tick();
        self.inner.store_infos().await
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.tick();
        self.inner.store_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.tick();
        self.inner.delete_store(name).await
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        self.tick();
        self.inner.match_in(store, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        self.tick();
        self.inner.match_any(request).await
    }

    async fn put(&self, store: &str, request: &Request, response: &CachedResponse) -> Result<(), Error> {
        self.tick();
        self.inner.put(store, request, response).await
    }

    async fn put_all(&self, store: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        self.tick();
        self.inner.put_all(store, entries).await
    }

    async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        self.tick();
        self.inner.entry_count(store).await
    }

    async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        self.tick();
        self.inner.entry_urls(store).await
    }
}
