use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artist::ArtistId;
use crate::metrics::{FreshnessConfig, MetricsRecord};

pub const BASIC_ONLY_BATCH_SIZE: usize = 20;
pub const ANALYTICS_ONLY_BATCH_SIZE: usize = 15;
const ANALYTICS_ONLY_STAGGER: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPriority {
    High,
    Medium,
    Low,
}

impl RefreshPriority {
    pub fn batch_size(self) -> usize {
        match self {
            RefreshPriority::High => 20,
            RefreshPriority::Medium => 15,
            RefreshPriority::Low => 10,
        }
    }

    /// Delay before the `index`-th batch of this priority is due.
    pub fn batch_delay(self, index: usize) -> Duration {
        let index = index as u32;
        match self {
            RefreshPriority::High => Duration::from_secs(30) * index,
            RefreshPriority::Medium => Duration::from_secs(2 * 60) * index,
            RefreshPriority::Low => Duration::from_secs(5 * 60) + Duration::from_secs(5 * 60) * index,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RefreshPriority::High => "high",
            RefreshPriority::Medium => "medium",
            RefreshPriority::Low => "low",
        }
    }
}

/// Buckets an artist by how stale its channel data is; `None` means nothing to refresh.
pub fn classify_refresh_priority(
    metrics: Option<&MetricsRecord>,
    now: DateTime<Utc>,
    freshness: &FreshnessConfig,
) -> Option<RefreshPriority> {
    let Some(metrics) = metrics else {
        return Some(RefreshPriority::High);
    };

    if metrics.is_youtube_stale(now, freshness) {
        Some(RefreshPriority::High)
    } else if !metrics.has_youtube_analytics() && metrics.has_youtube_data() {
        Some(RefreshPriority::Low)
    } else if metrics.is_youtube_analytics_stale(now, freshness) {
        Some(RefreshPriority::Medium)
    } else {
        None
    }
}

pub fn needs_basic_refresh(metrics: Option<&MetricsRecord>, now: DateTime<Utc>, freshness: &FreshnessConfig) -> bool {
    metrics.is_none_or(|m| m.is_youtube_stale(now, freshness))
}

pub fn needs_analytics_refresh(
    metrics: Option<&MetricsRecord>,
    now: DateTime<Utc>,
    freshness: &FreshnessConfig,
) -> bool {
    metrics.is_some_and(|m| m.is_youtube_analytics_stale(now, freshness))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBatch {
    pub artist_ids: Vec<ArtistId>,
    pub batch_size_hint: usize,
    pub delay: Duration,
}

pub fn plan_priority_batches(priority: RefreshPriority, artist_ids: &[ArtistId]) -> Vec<PlannedBatch> {
    let batch_size = priority.batch_size();
    artist_ids
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| PlannedBatch {
            artist_ids: chunk.to_vec(),
            batch_size_hint: batch_size,
            delay: priority.batch_delay(index),
        })
        .collect()
}

pub fn plan_basic_batches(artist_ids: &[ArtistId]) -> Vec<PlannedBatch> {
    artist_ids
        .chunks(BASIC_ONLY_BATCH_SIZE)
        .map(|chunk| PlannedBatch {
            artist_ids: chunk.to_vec(),
            batch_size_hint: BASIC_ONLY_BATCH_SIZE,
            delay: Duration::ZERO,
        })
        .collect()
}

pub fn plan_analytics_batches(artist_ids: &[ArtistId]) -> Vec<PlannedBatch> {
    artist_ids
        .chunks(ANALYTICS_ONLY_BATCH_SIZE)
        .enumerate()
        .map(|(index, chunk)| PlannedBatch {
            artist_ids: chunk.to_vec(),
            batch_size_hint: ANALYTICS_ONLY_BATCH_SIZE,
            delay: ANALYTICS_ONLY_STAGGER * index as u32,
        })
        .collect()
}
