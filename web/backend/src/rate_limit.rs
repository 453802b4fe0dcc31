use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{CacheKey, KeyValueStore};
use crate::error::ApiError;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-minute request ceiling for the catalogue API.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    max_per_minute: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, max_per_minute: u32) -> Self {
        Self { store, max_per_minute }
    }

    pub fn window_for(now: DateTime<Utc>) -> String {
        now.format("%Y-%m-%d-%H-%M").to_string()
    }

    pub async fn check_and_increment(&self) -> Result<(), ApiError> {
        self.check_and_increment_window(&Self::window_for(Utc::now())).await
    }

    /// Fails without counting once the window's ceiling is reached.
    pub async fn check_and_increment_window(&self, window: &str) -> Result<(), ApiError> {
        let key = CacheKey::SpotifyRateWindow(window).to_string();
        let count = self
            .store
            .get(&key)
            .await
            .and_then(|value| value.as_u64())
            .unwrap_or(0);

        if count >= self.max_per_minute as u64 {
            tracing::warn!(count, limit = self.max_per_minute, "Spotify rate limit exceeded");
            return Err(ApiError::RateLimited { retry_after: WINDOW });
        }

        self.store.set(&key, Value::from(count + 1), Some(WINDOW)).await;
        Ok(())
    }
}
