//! Entry lookup and insertion within stores.
//!
//! Matching follows the platform Cache API: exact key match on method and
//! URL, and only GET requests are ever stored or matched.

use super::connection::CacheDb;
use super::entry::{CachedResponse, Request};
use crate::Error;
use tokio_rusqlite::rusqlite::{self, Connection, Row};
use tokio_rusqlite::params;

fn ensure_cacheable(request: &Request) -> Result<(), Error> {
    if request.is_get() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("only GET requests can be cached, got {}", request.method)))
    }
}

fn response_from_row(row: &Row<'_>) -> rusqlite::Result<(String, u16, String, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode(raw: (String, u16, String, Vec<u8>)) -> Result<CachedResponse, Error> {
    let (url, status, headers_json, body) = raw;
    let headers = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { url, status, headers, body })
}

fn insert_entry(conn: &Connection, store: &str, request: &Request, response: &CachedResponse) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO entries (store, key, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(store, key) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            request.key(),
            &request.method,
            &request.url,
            response.status,
            headers_json,
            &response.body,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn store_exists(conn: &Connection, store: &str) -> Result<bool, Error> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
        params![store],
        |row| row.get(0),
    )?;
    Ok(exists)
}

impl CacheDb {
    /// Find the entry for a request in one store.
    pub async fn match_in(&self, store: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let store = store.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, headers_json, body FROM entries WHERE store = ?1 AND key = ?2",
                    params![store, key],
                    response_from_row,
                );

                match result {
                    Ok(raw) => Ok(Some(decode(raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Find the entry for a request in any store, oldest store first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT e.url, e.status, e.headers_json, e.body
                     FROM entries e JOIN stores s ON s.name = e.store
                     WHERE e.key = ?1
                     ORDER BY s.created_at ASC, s.rowid ASC
                     LIMIT 1",
                    params![key],
                    response_from_row,
                );

                match result {
                    Ok(raw) => Ok(Some(decode(raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite the entry for a request.
    ///
    /// The store must exist; a write racing an eviction fails with
    /// `StoreNotFound` instead of recreating the store.
    pub async fn put(&self, store: &str, request: &Request, response: &CachedResponse) -> Result<(), Error> {
        ensure_cacheable(request)?;
        let store = store.to_string();
        let request = request.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                if !store_exists(conn, &store)? {
                    return Err(Error::StoreNotFound(store));
                }
                insert_entry(conn, &store, &request, &response)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert several entries in one transaction; either all land or none do.
    pub async fn put_all(&self, store: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        for (request, _) in &entries {
            ensure_cacheable(request)?;
        }
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !store_exists(&tx, &store)? {
                    return Err(Error::StoreNotFound(store));
                }
                for (request, response) in &entries {
                    insert_entry(&tx, &store, request, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs held by a store, sorted.
    pub async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
