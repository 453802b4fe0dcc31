use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::types::DAY;
use crate::cache::{CacheKey, KeyValueStore};

const WARNING_THRESHOLDS: [u32; 4] = [50, 75, 90, 95];
const LOW_QUOTA_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuotaStatus {
    pub used: u32,
    pub remaining: u32,
    pub limit: u32,
    pub percentage_used: f64,
    pub is_exhausted: bool,
    pub date: String,
    pub resets_at: DateTime<Utc>,
}

/// Daily unit budget for the metered video API, kept in the shared store.
///
/// Usage is keyed by UTC date. The exhausted flag is separate and sticky: it
/// survives until the end of the UTC day or an explicit `reset`.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn KeyValueStore>,
    daily_limit: u32,
}

fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

fn until_end_of_day(now: DateTime<Utc>) -> Duration {
    (next_reset(now) - now).to_std().unwrap_or(DAY)
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, daily_limit: u32) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    fn usage_key(now: DateTime<Utc>) -> String {
        CacheKey::YoutubeQuotaUsage(now.date_naive()).to_string()
    }

    pub async fn used_today(&self) -> u32 {
        self.store
            .get(&Self::usage_key(Utc::now()))
            .await
            .and_then(|value| value.as_u64())
            .map(|used| used.min(u32::MAX as u64) as u32)
            .unwrap_or(0)
    }

    pub async fn is_exhausted(&self) -> bool {
        self.store
            .has(&CacheKey::YoutubeQuotaExhausted.to_string())
            .await
    }

    pub async fn check_availability(&self, cost: u32) -> bool {
        if self.is_exhausted().await {
            return false;
        }
        self.used_today().await.saturating_add(cost) <= self.daily_limit
    }

    /// Records `cost` units against today's budget and returns the warning
    /// thresholds (in percent) this call crossed.
    pub async fn track(&self, cost: u32) -> Vec<u32> {
        let now = Utc::now();
        let previous = self.used_today().await;
        let current = previous.saturating_add(cost);

        self.store
            .set(&Self::usage_key(now), Value::from(current), Some(until_end_of_day(now)))
            .await;

        let crossed: Vec<u32> = WARNING_THRESHOLDS
            .into_iter()
            .filter(|percent| {
                let threshold = (self.daily_limit as u64 * *percent as u64 / 100) as u32;
                previous < threshold && current >= threshold
            })
            .collect();
        for percent in &crossed {
            tracing::warn!(
                threshold = percent,
                used = current,
                limit = self.daily_limit,
                "YouTube quota usage crossed threshold"
            );
        }

        if current >= self.daily_limit {
            tracing::warn!(used = current, limit = self.daily_limit, "YouTube daily quota exhausted");
            self.mark_exhausted().await;
        }
        crossed
    }

    /// Flags the quota as spent, e.g. after the provider rejected a call for quota reasons.
    pub async fn mark_exhausted(&self) {
        self.store
            .set(
                &CacheKey::YoutubeQuotaExhausted.to_string(),
                Value::Bool(true),
                Some(until_end_of_day(Utc::now())),
            )
            .await;
    }

    pub async fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used_today().await)
    }

    pub async fn usage_percentage(&self) -> f64 {
        if self.daily_limit == 0 {
            return 100.0;
        }
        let percentage = self.used_today().await as f64 / self.daily_limit as f64 * 100.0;
        (percentage * 100.0).round() / 100.0
    }

    pub async fn is_low(&self) -> bool {
        self.used_today().await as f64 >= self.daily_limit as f64 * LOW_QUOTA_RATIO
    }

    pub async fn should_use_graceful_degradation(&self) -> bool {
        self.is_exhausted().await || self.is_low().await
    }

    pub async fn reset(&self) {
        self.store.forget(&Self::usage_key(Utc::now())).await;
        self.store
            .forget(&CacheKey::YoutubeQuotaExhausted.to_string())
            .await;
        tracing::info!("YouTube quota reset");
    }

    pub async fn status(&self) -> QuotaStatus {
        let now = Utc::now();
        QuotaStatus {
            used: self.used_today().await,
            remaining: self.remaining().await,
            limit: self.daily_limit,
            percentage_used: self.usage_percentage().await,
            is_exhausted: self.is_exhausted().await,
            date: now.format("%Y-%m-%d").to_string(),
            resets_at: next_reset(now),
        }
    }
}
