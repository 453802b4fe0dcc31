pub mod storage;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use storage::MokaStore;
pub use types::CacheKey;

/// Shared key-value store with per-entry TTL.
///
/// A stored JSON `null` is a negative entry and is returned as `Some(Value::Null)`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>);
    async fn has(&self, key: &str) -> bool;
    async fn forget(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cached<T> {
    Hit(T),
    /// A remembered "does not exist" answer.
    NotFound,
    Miss,
}

/// Typed view over the store used in front of every external read.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey<'_>) -> Cached<T> {
        let key = key.to_string();
        match self.store.get(&key).await {
            None => Cached::Miss,
            Some(Value::Null) => Cached::NotFound,
            Some(value) => match serde_json::from_value(value) {
                Ok(parsed) => Cached::Hit(parsed),
                Err(e) => {
                    tracing::debug!(cache_key = %key, error = %e, "Dropping unreadable cache entry");
                    self.store.forget(&key).await;
                    Cached::Miss
                }
            },
        }
    }

    pub async fn put<T: Serialize>(&self, key: &CacheKey<'_>, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.store.set(&key.to_string(), json, Some(ttl)).await,
            Err(e) => tracing::warn!(cache_key = %key, error = %e, "Failed to serialize cache entry"),
        }
    }

    pub async fn put_not_found(&self, key: &CacheKey<'_>, ttl: Duration) {
        self.store.set(&key.to_string(), Value::Null, Some(ttl)).await;
    }

    pub async fn forget(&self, key: &CacheKey<'_>) {
        self.store.forget(&key.to_string()).await;
    }
}
