//! Activation-time eviction of superseded stores.

use shellcache_core::{CacheStorage, Error};

/// Delete every store whose name is not exactly `current`.
///
/// Returns the names that were deleted, in the order they were listed.
pub async fn evict_stale(storage: &dyn CacheStorage, current: &str) -> Result<Vec<String>, Error> {
    let mut evicted = Vec::new();
    for name in storage.store_names().await? {
        if name == current {
            continue;
        }
        tracing::info!(store = %name, "clearing old cache");
        if storage.delete_store(&name).await? {
            evicted.push(name);
        }
    }
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_core::CacheDb;

    #[tokio::test]
    async fn test_evicts_all_but_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["v1", "v2", "v3", "v4"] {
            db.open_store(name).await.unwrap();
        }

        let evicted = evict_stale(&db, "v4").await.unwrap();

        assert_eq!(evicted, vec!["v1", "v2", "v3"]);
        assert_eq!(db.store_names().await.unwrap(), vec!["v4".to_string()]);
    }

    #[tokio::test]
    async fn test_exact_name_match_only() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("app-v1").await.unwrap();
        db.open_store("app-v10").await.unwrap();

        evict_stale(&db, "app-v1").await.unwrap();
        assert_eq!(db.store_names().await.unwrap(), vec!["app-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_nothing_to_evict() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        assert!(evict_stale(&db, "v1").await.unwrap().is_empty());
    }
}
