//! SQLite store backend.
//!
//! One `kv` table holds every key. Each write runs in an immediate
//! transaction so the version check and the update are atomic even when
//! several processes share the database file. Change notifications are
//! delivered to subscribers of this handle.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::traits::{check_version, Store, StoreChange, Versioned, WriteOptions};

/// Durable store backed by a SQLite file.
pub struct SqliteStore {
    db_path: PathBuf,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Backend(format!("create {}: {}", dir.display(), e)))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        tracing::info!(path = %path.display(), "SQLite store opened");

        Ok(Self {
            db_path: path.to_path_buf(),
            changes: broadcast::channel(256).0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn commit(&self, key: &str, value: Option<Value>, options: WriteOptions) -> StoreResult<u64> {
        let db_path = self.db_path.clone();
        let key_owned = key.to_string();
        let encoded = value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let expected = options.clone();

        let (old, version) = tokio::task::spawn_blocking(move || -> StoreResult<(Option<Value>, u64)> {
            let mut conn = Connection::open(&db_path)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<(Option<String>, i64)> = tx
                .query_row(
                    "SELECT value, version FROM kv WHERE key = ?1",
                    params![key_owned],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (old_raw, current_version) = current.unwrap_or((None, 0));
            let current_version = current_version as u64;
            check_version(&key_owned, current_version, &expected)?;

            let next = current_version + 1;
            tx.execute(
                "INSERT INTO kv (key, value, version, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                     version = excluded.version, updated_at = excluded.updated_at",
                params![key_owned, encoded, next as i64, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;

            let old = old_raw.and_then(|raw| serde_json::from_str(&raw).ok());
            Ok((old, next))
        })
        .await??;

        tracing::debug!(key = %key, version, origin = %options.origin, "Store write committed");

        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            old,
            new: value,
            version,
            origin: options.origin,
        });
        Ok(version)
    }

    async fn read_row(&self, key: &str) -> StoreResult<Option<(Option<String>, u64)>> {
        let db_path = self.db_path.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> StoreResult<Option<(Option<String>, u64)>> {
            let conn = Connection::open(&db_path)?;
            let row = conn
                .query_row(
                    "SELECT value, version FROM kv WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            Ok(row.map(|(value, version)| (value, version as u64)))
        })
        .await?
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let Some((Some(raw), version)) = self.read_row(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(Versioned { value, version }))
    }

    async fn version(&self, key: &str) -> StoreResult<u64> {
        Ok(self.read_row(key).await?.map_or(0, |(_, version)| version))
    }

    async fn set(&self, key: &str, value: Value, options: WriteOptions) -> StoreResult<u64> {
        self.commit(key, Some(value), options).await
    }

    async fn remove(&self, key: &str, options: WriteOptions) -> StoreResult<u64> {
        self.commit(key, None, options).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("nested").join("store.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (_dir, store) = open_temp();
        store.set("k", json!({"a": 1}), WriteOptions::new("t")).await.unwrap();
        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.value, json!({"a": 1}));
        assert_eq!(got.version, 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", json!("v1"), WriteOptions::new("t")).await.unwrap();
            store.set("k", json!("v2"), WriteOptions::new("t")).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.value, json!("v2"));
        assert_eq!(got.version, 2);
    }

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let (_dir, store) = open_temp();
        store.set("k", json!(1), WriteOptions::new("a")).await.unwrap();
        let err = store
            .set("k", json!(2), WriteOptions::new("a").expecting(0))
            .await
            .unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn test_remove_and_notify() {
        let (_dir, store) = open_temp();
        let mut rx = store.subscribe();

        store.set("k", json!(1), WriteOptions::new("a")).await.unwrap();
        store.remove("k", WriteOptions::new("b")).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.new, Some(json!(1)));
        assert_eq!(second.old, Some(json!(1)));
        assert_eq!(second.new, None);
        assert_eq!(second.origin, "b");
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.version("k").await.unwrap(), 2);
    }
}
