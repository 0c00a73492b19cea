//! libSQL-backed key-value store

use std::path::Path;
use std::sync::Arc;

use libsql::Connection;
use serde_json::Value;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::db::Database;
use crate::error::Result;

/// Durable store over the `kv_store` table of a local libSQL file.
///
/// All access goes through one connection behind an async mutex, and every
/// `update` runs as a `BEGIN IMMEDIATE` transaction so a crash mid-write
/// leaves the previous value in place.
#[derive(Clone)]
pub struct LibSqlStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlStore {
    /// Wrap an already opened database.
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open (or create) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

impl KeyValueStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let db = self.db.lock().await;
        read_value(db.connection(), key).await
    }

    async fn update<F>(&self, key: &str, apply: F) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value>,
    {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute("BEGIN IMMEDIATE", ()).await?;

        let result: Result<Value> = async {
            let current = read_value(conn, key).await?;
            let next = apply(current)?;
            write_value(conn, key, &next).await?;
            Ok(next)
        }
        .await;

        match result {
            Ok(next) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    conn.execute("ROLLBACK", ()).await.ok();
                    return Err(e.into());
                }
                tracing::debug!(key, "Committed key-value update");
                Ok(next)
            }
            Err(error) => {
                conn.execute("ROLLBACK", ()).await.ok();
                Err(error)
            }
        }
    }
}

async fn read_value(conn: &Connection, key: &str) -> Result<Option<Value>> {
    let mut rows = conn
        .query("SELECT value FROM kv_store WHERE key = ?", [key])
        .await?;

    if let Some(row) = rows.next().await? {
        let raw: String = row.get(0)?;
        Ok(Some(serde_json::from_str(&raw)?))
    } else {
        Ok(None)
    }
}

async fn write_value(conn: &Connection, key: &str, value: &Value) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    let now = chrono::Utc::now().timestamp_millis();

    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        libsql::params![key, raw, now],
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_key() {
        let store = LibSqlStore::open_in_memory().await.unwrap();
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_inserts_then_replaces() {
        let store = LibSqlStore::open_in_memory().await.unwrap();

        store.update("k", |_| Ok(json!({"n": 1}))).await.unwrap();
        let next = store
            .update("k", |current| {
                let n = current
                    .and_then(|value| value.get("n").and_then(Value::as_i64))
                    .unwrap_or_default();
                Ok(json!({"n": n + 1}))
            })
            .await
            .unwrap();

        assert_eq!(next, json!({"n": 2}));
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"n": 2})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_update_rolls_back() {
        let store = LibSqlStore::open_in_memory().await.unwrap();
        store.update("k", |_| Ok(json!([1, 2]))).await.unwrap();

        let result = store
            .update("k", |_| Err(Error::InvalidInput("abort".into())))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));

        // The connection is usable again after the rollback
        store.update("k", |_| Ok(json!([3]))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([3])));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_value_survives_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("outbox.db");

        {
            let store = LibSqlStore::open(&db_path).await.unwrap();
            store
                .update("offline", |_| Ok(json!([{"clientId": "c1"}])))
                .await
                .unwrap();
        }

        let reopened = LibSqlStore::open(&db_path).await.unwrap();
        assert_eq!(
            reopened.get("offline").await.unwrap(),
            Some(json!([{"clientId": "c1"}]))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let store = LibSqlStore::open_in_memory().await.unwrap();

        let increment = |store: LibSqlStore| async move {
            store
                .update("counter", |current| {
                    let n = current.and_then(|value| value.as_i64()).unwrap_or_default();
                    Ok(json!(n + 1))
                })
                .await
                .unwrap();
        };

        tokio::join!(
            increment(store.clone()),
            increment(store.clone()),
            increment(store.clone()),
            increment(store.clone()),
        );

        assert_eq!(store.get("counter").await.unwrap(), Some(json!(4)));
    }
}
