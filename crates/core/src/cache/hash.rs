//! Cache key and version identifier generation.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request identity.
///
/// The method is uppercased so `get` and `GET` share an entry.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the store version identifier from everything that shapes cached content.
///
/// Any change to the routing strategy, the excluded prefix or the seed list
/// yields a new name, which makes the janitor evict the previous store.
pub fn compute_version(app_name: &str, strategy: &str, excluded_prefix: &str, seeds: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(app_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(strategy.as_bytes());
    hasher.update(b"\n");
    hasher.update(excluded_prefix.as_bytes());
    for seed in seeds {
        hasher.update(b"\n");
        hasher.update(seed.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{app_name}-{}", &digest[..16])
}
