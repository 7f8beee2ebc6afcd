//! In-memory store backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::error::StoreResult;
use crate::traits::{check_version, Store, StoreChange, Versioned, WriteOptions};

#[derive(Debug, Default)]
struct Slot {
    value: Option<Value>,
    version: u64,
}

/// Store kept entirely in process memory.
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Slot>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// `capacity` bounds how many unread changes a slow subscriber may lag.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            changes: broadcast::channel(capacity).0,
        }
    }

    async fn commit(&self, key: &str, value: Option<Value>, options: WriteOptions) -> StoreResult<u64> {
        let change = {
            let mut slots = self.slots.write().await;
            let slot = slots.entry(key.to_string()).or_default();
            check_version(key, slot.version, &options)?;

            slot.version += 1;
            let old = std::mem::replace(&mut slot.value, value.clone());
            StoreChange {
                key: key.to_string(),
                old,
                new: value,
                version: slot.version,
                origin: options.origin,
            }
        };

        let version = change.version;
        tracing::debug!(key = %key, version, origin = %change.origin, "Store write committed");
        let _ = self.changes.send(change);
        Ok(version)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let slots = self.slots.read().await;
        Ok(slots.get(key).and_then(|slot| {
            slot.value.clone().map(|value| Versioned {
                value,
                version: slot.version,
            })
        }))
    }

    async fn version(&self, key: &str) -> StoreResult<u64> {
        Ok(self.slots.read().await.get(key).map_or(0, |s| s.version))
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
    use crate::error::StoreError;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert_eq!(store.version("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_increments_version() {
        let store = MemoryStore::new();
        assert_eq!(store.set("k", json!(1), WriteOptions::new("a")).await.unwrap(), 1);
        assert_eq!(store.set("k", json!(2), WriteOptions::new("a")).await.unwrap(), 2);

        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.value, json!(2));
        assert_eq!(got.version, 2);
    }

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let store = MemoryStore::new();
        store.set("k", json!("first"), WriteOptions::new("a")).await.unwrap();
        store.set("k", json!("second"), WriteOptions::new("b")).await.unwrap();

        let err = store
            .set("k", json!("late"), WriteOptions::new("a").expecting(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleWrite { expected: 1, actual: 2, .. }));
        assert_eq!(store.get("k").await.unwrap().unwrap().value, json!("second"));
    }

    #[tokio::test]
    async fn test_change_notification_carries_origin() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set("k", json!([1]), WriteOptions::new("sidebar")).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.origin, "sidebar");
        assert_eq!(change.old, None);
        assert_eq!(change.new, Some(json!([1])));
        assert_eq!(change.version, 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_version_monotonic() {
        let store = MemoryStore::new();
        store.set("k", json!(1), WriteOptions::new("a")).await.unwrap();
        assert_eq!(store.remove("k", WriteOptions::new("a")).await.unwrap(), 2);
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.version("k").await.unwrap(), 2);
        assert_eq!(store.set("k", json!(3), WriteOptions::new("a").expecting(2)).await.unwrap(), 3);
    }
}
