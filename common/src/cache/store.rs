use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors raised by a cache backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
    #[error("Cache command error: {0}")]
    Command(String),
}

/// Minimal key-value contract every cache consumer relies on.
///
/// Values are opaque strings; typed consumers go through [`get_json`] and
/// [`set_json`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Batched read; the result is positionally aligned with `keys`.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn set_forever(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomic set-if-absent. Returns `true` when this caller created the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes `key` only while it still holds `expected`.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn flush(&self) -> Result<(), StoreError>;
}

pub async fn get_json<T>(store: &dyn CacheStore, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(key, error = %err, "Discarding undecodable cache entry");
            Ok(None)
        }
    }
}

pub async fn set_json<T>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError>
where
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value).map_err(|e| StoreError::Command(e.to_string()))?;
    match ttl {
        Some(ttl) => store.set(key, &raw, ttl).await,
        None => store.set_forever(key, &raw).await,
    }
}
