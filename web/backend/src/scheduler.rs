use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lineupscout_core::priority::{
    needs_analytics_refresh, needs_basic_refresh, plan_analytics_batches, plan_basic_batches, plan_priority_batches,
};
use lineupscout_core::{
    ArtistId, FreshnessConfig, MetricsRecord, PlannedBatch, RefreshPriority, classify_refresh_priority,
};
use serde::Serialize;

use crate::error::ServiceError;
use crate::queue::{Job, JobQueue};
use crate::quota::QuotaLedger;
use crate::repository::ArtistRepository;

/// Jobs emitted by one priority dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub total_jobs: usize,
    pub total_artists: usize,
    pub quota_exhausted: bool,
}

/// Turns artist ids into staggered `FetchYoutubeData` jobs, most stale first.
pub struct RefreshScheduler {
    repository: Arc<dyn ArtistRepository>,
    queue: Arc<dyn JobQueue>,
    quota: QuotaLedger,
    freshness: FreshnessConfig,
}

impl RefreshScheduler {
    pub fn new(
        repository: Arc<dyn ArtistRepository>,
        queue: Arc<dyn JobQueue>,
        quota: QuotaLedger,
        freshness: FreshnessConfig,
    ) -> Self {
        Self {
            repository,
            queue,
            quota,
            freshness,
        }
    }

    /// Artists with a channel id, paired with their metrics.
    async fn artists_with_channels(
        &self,
        artist_ids: &[ArtistId],
    ) -> Result<Vec<(ArtistId, Option<MetricsRecord>)>, ServiceError> {
        let mut result = Vec::new();
        for artist in self.repository.find_artists(artist_ids).await? {
            if !artist.has_youtube_channel() {
                continue;
            }
            let metrics = self.repository.get_metrics(artist.id).await?;
            result.push((artist.id, metrics));
        }
        Ok(result)
    }

    async fn enqueue_batches(&self, batches: Vec<PlannedBatch>) -> Result<usize, ServiceError> {
        let count = batches.len();
        for batch in batches {
            let delay = (batch.delay > Duration::ZERO).then_some(batch.delay);
            self.queue
                .enqueue(
                    Job::FetchYoutubeData {
                        artist_ids: batch.artist_ids,
                        batch_size_hint: batch.batch_size_hint,
                    },
                    delay,
                )
                .await?;
        }
        Ok(count)
    }

    /// With `respect_quota` nothing is dispatched while the quota is unavailable,
    /// which is reported through `quota_exhausted`.
    pub async fn dispatch_priority_jobs(
        &self,
        artist_ids: &[ArtistId],
        respect_quota: bool,
    ) -> Result<DispatchStats, ServiceError> {
        let mut stats = DispatchStats {
            total_artists: artist_ids.len(),
            ..DispatchStats::default()
        };

        if artist_ids.is_empty() {
            return Ok(stats);
        }

        if respect_quota && !self.quota.check_availability(1).await {
            tracing::warn!(artist_count = artist_ids.len(), "Quota exhausted, skipping job dispatch");
            stats.quota_exhausted = true;
            return Ok(stats);
        }

        let artists = self.artists_with_channels(artist_ids).await?;
        stats.total_artists = artists.len();
        if artists.is_empty() {
            tracing::info!(requested = artist_ids.len(), "No artists with YouTube channel ids to refresh");
            return Ok(stats);
        }

        let now = Utc::now();
        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut low = Vec::new();
        for (artist_id, metrics) in &artists {
            match classify_refresh_priority(metrics.as_ref(), now, &self.freshness) {
                Some(RefreshPriority::High) => high.push(*artist_id),
                Some(RefreshPriority::Medium) => medium.push(*artist_id),
                Some(RefreshPriority::Low) => low.push(*artist_id),
                None => {}
            }
        }

        for (priority, ids) in [
            (RefreshPriority::High, high),
            (RefreshPriority::Medium, medium),
            (RefreshPriority::Low, low),
        ] {
            if ids.is_empty() {
                continue;
            }
            let jobs = self.enqueue_batches(plan_priority_batches(priority, &ids)).await?;
            tracing::debug!(
                priority = priority.as_str(),
                artist_count = ids.len(),
                job_count = jobs,
                batch_size = priority.batch_size(),
                "Dispatched priority batch"
            );
            match priority {
                RefreshPriority::High => stats.high_priority = jobs,
                RefreshPriority::Medium => stats.medium_priority = jobs,
                RefreshPriority::Low => stats.low_priority = jobs,
            }
            stats.total_jobs += jobs;
        }

        tracing::info!(
            high = stats.high_priority,
            medium = stats.medium_priority,
            low = stats.low_priority,
            total_jobs = stats.total_jobs,
            total_artists = stats.total_artists,
            "Priority jobs dispatched"
        );
        Ok(stats)
    }

    /// Jobs for artists with missing or stale basic metrics only.
    pub async fn dispatch_basic_metrics_jobs(&self, artist_ids: &[ArtistId]) -> Result<usize, ServiceError> {
        if artist_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let due: Vec<ArtistId> = self
            .artists_with_channels(artist_ids)
            .await?
            .into_iter()
            .filter(|(_, metrics)| needs_basic_refresh(metrics.as_ref(), now, &self.freshness))
            .map(|(artist_id, _)| artist_id)
            .collect();

        if due.is_empty() {
            return Ok(0);
        }

        let jobs = self.enqueue_batches(plan_basic_batches(&due)).await?;
        tracing::info!(artist_count = due.len(), job_count = jobs, "Dispatched basic metrics jobs");
        Ok(jobs)
    }

    /// Jobs for artists whose video analytics are stale, two minutes apart.
    pub async fn dispatch_analytics_jobs(&self, artist_ids: &[ArtistId]) -> Result<usize, ServiceError> {
        if artist_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let due: Vec<ArtistId> = self
            .artists_with_channels(artist_ids)
            .await?
            .into_iter()
            .filter(|(_, metrics)| needs_analytics_refresh(metrics.as_ref(), now, &self.freshness))
            .map(|(artist_id, _)| artist_id)
            .collect();

        if due.is_empty() {
            return Ok(0);
        }

        let jobs = self.enqueue_batches(plan_analytics_batches(&due)).await?;
        tracing::info!(artist_count = due.len(), job_count = jobs, "Dispatched analytics jobs");
        Ok(jobs)
    }
}
