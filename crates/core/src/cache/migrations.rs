//! Schema migrations for the cache database.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its version row, so a failed
//! batch leaves neither tables nor a version mark behind.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered (version, SQL) pairs. Versions must be strictly increasing.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache_storage.sql"))];

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
///
/// Returns `MigrationFailed` naming the version whose SQL did not apply.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            tracing::debug!(version, "applying cache migration");
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rerun_records_each_version_once() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let versions: Vec<i64> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT version FROM _migrations ORDER BY version")?;
                stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>, _>>()
            })
            .await
            .unwrap();

        assert_eq!(versions, MIGRATIONS.iter().map(|(v, _)| *v).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_deleting_store_cascades_to_entries() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let remaining: i64 = conn
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys=ON;
                     INSERT INTO stores (name, created_at) VALUES ('v1', 'now');
                     INSERT INTO entries (store, key, method, url, status, headers_json, body, stored_at)
                     VALUES ('v1', 'k', 'GET', 'http://localhost/', 200, '[]', x'', 'now');
                     DELETE FROM stores WHERE name = 'v1';",
                )?;
                conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            })
            .await
            .unwrap();

        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_entry_requires_existing_store() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let result = conn
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys=ON;
                     INSERT INTO entries (store, key, method, url, status, headers_json, body, stored_at)
                     VALUES ('gone', 'k', 'GET', 'http://localhost/', 200, '[]', x'', 'now');",
                )
            })
            .await;

        assert!(result.is_err());
    }
}
