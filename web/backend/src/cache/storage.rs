use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;

use super::KeyValueStore;

#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process store backed by moka.
#[derive(Clone)]
pub struct MokaStore {
    cache: Cache<String, StoredValue>,
}

impl MokaStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl KeyValueStore for MokaStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(key).await.map(|stored| stored.value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.cache.insert(key.to_string(), StoredValue { value, ttl }).await;
    }

    async fn has(&self, key: &str) -> bool {
        self.cache.get(key).await.is_some()
    }

    async fn forget(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}
