//! Storage trait consumed by the worker.
//!
//! Keeps the routing policy independent of SQLite so tests can observe or
//! replace every cache read and write.

use super::connection::CacheDb;
use super::entry::{CachedResponse, Request};
use super::stores::StoreInfo;
use crate::Error;

/// Cache Storage operations used by the worker lifecycle and the gatekeeper.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent. Returns true when created.
    async fn open_store(&self, name: &str) -> Result<bool, Error>;

    /// All store names, oldest first.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Every store with its creation time and entry count, oldest first.
    async fn store_infos(&self) -> Result<Vec<StoreInfo>, Error>;

    /// Delete a store and its entries. Returns false if it did not exist.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    /// Exact-key lookup in one store.
    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<CachedResponse>, Error>;

    /// Exact-key lookup across all stores, oldest first.
    async fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>, Error>;

    async fn put(&self, store: &str, request: &Request, response: &CachedResponse) -> Result<(), Error>;

    /// All-or-nothing insert of several entries.
    async fn put_all(&self, store: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error>;

    async fn entry_count(&self, store: &str) -> Result<u64, Error>;

    async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open_store(&self, name: &str) -> Result<bool, Error> {
        CacheDb::open_store(self, name).await
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::store_names(self).await
    }

    async fn store_infos(&self) -> Result<Vec<StoreInfo>, Error> {
        CacheDb::store_infos(self).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_store(self, name).await
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        CacheDb::match_in(self, store, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        CacheDb::match_any(self, request).await
    }

    async fn put(&self, store: &str, request: &Request, response: &CachedResponse) -> Result<(), Error> {
        CacheDb::put(self, store, request, response).await
    }

    async fn put_all(&self, store: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        CacheDb::put_all(self, store, entries).await
    }

    async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        CacheDb::entry_count(self, store).await
    }

    async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        CacheDb::entry_urls(self, store).await
    }
}
