//! SQLite storage implementation.
//!
//! One key/value table. Good for a CLI or a single-process service that
//! wants the cache to survive restarts.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::{CacheError, CacheResult};
use crate::traits::store::PersistentStore;

/// SQLite-backed persistent store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: sqlx::Error) -> CacheError {
    CacheError::Backend(Box::new(e))
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./summaries.db?mode=rwc` - File, created if missing
    pub async fn new(database_url: &str) -> CacheResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> CacheResult<Self> {
        // A single connection: every pooled connection would otherwise get
        // its own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> CacheResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn get_all(&self) -> CacheResult<IndexMap<String, Vec<u8>>> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT key, value FROM kv_store ORDER BY rowid")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.set("a", b"1".to_vec()).await.unwrap();
        store.set("b", b"2".to_vec()).await.unwrap();
        store.set("a", b"3".to_vec()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(b"3".to_vec()));

        let keys: Vec<String> = store.get_all().await.unwrap().into_keys().collect();
        assert_eq!(keys, vec!["a", "b"]);

        store.remove(&["a".to_string()]).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }
}
