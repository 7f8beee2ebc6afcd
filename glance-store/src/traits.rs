//! Core store trait and types.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};

/// A committed value and the version it was committed at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub version: u64,
}

/// Per-write options.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Context that issued the write; echoed in the change notification.
    pub origin: String,
    /// Reject the write unless the key is still at this version.
    pub expected_version: Option<u64>,
}

impl WriteOptions {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            expected_version: None,
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Notification fired after every committed write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub old: Option<Value>,
    /// `None` when the key was removed.
    pub new: Option<Value>,
    pub version: u64,
    pub origin: String,
}

/// Durable, versioned key-value storage.
///
/// A key that was never written, or was removed, reads as `None`. Versions
/// start at 0 for unwritten keys and increase by one on every write or
/// removal, so a removed key never reuses a version.
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Last committed value of a key.
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Current version of a key, including removed keys.
    async fn version(&self, key: &str) -> StoreResult<u64>;

    /// Commit a value and notify subscribers. Returns the new version.
    async fn set(&self, key: &str, value: Value, options: WriteOptions) -> StoreResult<u64>;

    /// Remove a key and notify subscribers. Returns the new version.
    async fn remove(&self, key: &str, options: WriteOptions) -> StoreResult<u64>;

    /// Receive every change committed through this store.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Typed helpers over [`Store`].
#[async_trait]
pub trait StoreExt {
    /// Decode a key, returning `None` if absent.
    async fn load<T>(&self, key: &str) -> StoreResult<Option<(T, u64)>>
    where
        T: DeserializeOwned + Send;

    /// Decode a key, substituting `T::default()` when absent.
    async fn load_or_default<T>(&self, key: &str) -> StoreResult<(T, u64)>
    where
        T: DeserializeOwned + Default + Send;

    /// Encode and commit a value.
    async fn save<T>(&self, key: &str, value: &T, options: WriteOptions) -> StoreResult<u64>
    where
        T: Serialize + Sync;
}

#[async_trait]
impl<S> StoreExt for S
where
    S: Store + ?Sized,
{
    async fn load<T>(&self, key: &str) -> StoreResult<Option<(T, u64)>>
    where
        T: DeserializeOwned + Send,
    {
        let Some(versioned) = self.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_value(versioned.value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some((value, versioned.version)))
    }

    async fn load_or_default<T>(&self, key: &str) -> StoreResult<(T, u64)>
    where
        T: DeserializeOwned + Default + Send,
    {
        match self.load(key).await? {
            Some(found) => Ok(found),
            None => Ok((T::default(), self.version(key).await?)),
        }
    }

    async fn save<T>(&self, key: &str, value: &T, options: WriteOptions) -> StoreResult<u64>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set(key, value, options).await
    }
}

/// Version check shared by the backends.
pub(crate) fn check_version(key: &str, current: u64, options: &WriteOptions) -> StoreResult<()> {
    match options.expected_version {
        Some(expected) if expected != current => Err(StoreError::StaleWrite {
            key: key.to_string(),
            expected,
            actual: current,
        }),
        _ => Ok(()),
    }
}
