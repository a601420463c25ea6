//! Install-time seeding of the current store.

use shellcache_core::{CacheStorage, Error, Request};
use url::Url;

use crate::fetch::Network;

/// Open (or create) `store` and fill it with every seed asset.
///
/// All seeds are fetched before anything is written, and the write is a
/// single transaction: one failed or non-2xx seed leaves the store empty of
/// seeds and fails the install. Returns the number of entries written.
pub async fn provision(
    storage: &dyn CacheStorage, network: &dyn Network, store: &str, seeds: &[Url],
) -> Result<usize, Error> {
    let created = storage.open_store(store).await?;
    tracing::info!(store, created, seeds = seeds.len(), "caching static assets");

    let mut entries = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let request = Request::get(seed.as_str());
        let response = network
            .fetch(&request)
            .await
            .map_err(|e| Error::SeedFailed { url: seed.to_string(), reason: e.to_string() })?;

        if !response.is_ok() {
            return Err(Error::SeedFailed { url: seed.to_string(), reason: format!("status {}", response.status) });
        }
        entries.push((request, response));
    }

    let count = entries.len();
    storage.put_all(store, entries).await?;
    Ok(count)
}
