use std::sync::Arc;

use chrono::Utc;
use lineupscout_core::{ArtistRecord, FreshnessConfig, MetricsUpdate};

use crate::error::{ApiError, ServiceError};
use crate::repository::ArtistRepository;
use crate::youtube::YouTubeClient;

/// Refreshes one artist's YouTube metrics and video analytics.
///
/// Provider failures are logged and reported as `false`; only storage errors surface.
pub struct ArtistMetricsRefresher {
    youtube: Arc<YouTubeClient>,
    repository: Arc<dyn ArtistRepository>,
    freshness: FreshnessConfig,
}

impl ArtistMetricsRefresher {
    pub fn new(youtube: Arc<YouTubeClient>, repository: Arc<dyn ArtistRepository>, freshness: FreshnessConfig) -> Self {
        Self {
            youtube,
            repository,
            freshness,
        }
    }

    /// Refreshes both facets. `false` when there is no channel or the channel was not found.
    pub async fn force_refresh(&self, artist: &ArtistRecord) -> Result<bool, ServiceError> {
        let Some(channel_id) = artist.youtube_channel() else {
            return Ok(false);
        };

        if !self.refresh_basic_metrics(artist).await? {
            return Ok(false);
        }
        self.refresh_analytics(artist).await?;

        tracing::info!(artist_id = artist.id, channel_id, "YouTube data force refreshed");
        Ok(true)
    }

    /// Refreshes whichever facets are stale; `true` when anything was attempted.
    pub async fn refresh_if_needed(&self, artist: &ArtistRecord) -> Result<bool, ServiceError> {
        if !artist.has_youtube_channel() {
            return Ok(false);
        }

        let Some(metrics) = self.repository.get_metrics(artist.id).await? else {
            return self.force_refresh(artist).await;
        };

        let now = Utc::now();
        let mut attempted = false;

        if metrics.is_youtube_stale(now, &self.freshness) {
            self.refresh_basic_metrics(artist).await?;
            attempted = true;
        }

        if metrics.is_youtube_analytics_stale(now, &self.freshness) {
            self.refresh_analytics(artist).await?;
            attempted = true;
        }

        Ok(attempted)
    }

    pub async fn refresh_basic_metrics(&self, artist: &ArtistRecord) -> Result<bool, ServiceError> {
        let Some(channel_id) = artist.youtube_channel() else {
            return Ok(false);
        };

        let channel = match self.youtube.channel_metrics(channel_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => return Ok(false),
            Err(err) => {
                log_failure(&err, "Failed to refresh YouTube basic metrics", artist, channel_id);
                return Ok(false);
            }
        };

        self.repository
            .update_metrics(
                artist.id,
                MetricsUpdate {
                    youtube_subscribers: Some(Some(channel.subscriber_count)),
                    youtube_refreshed_at: Some(Utc::now()),
                    ..MetricsUpdate::default()
                },
            )
            .await?;

        tracing::debug!(artist_id = artist.id, subscribers = channel.subscriber_count, "YouTube basic metrics refreshed");
        Ok(true)
    }

    /// A record created here also gets its general `refreshed_at` stamp.
    pub async fn refresh_analytics(&self, artist: &ArtistRecord) -> Result<bool, ServiceError> {
        let Some(channel_id) = artist.youtube_channel() else {
            return Ok(false);
        };

        let analytics = match self.youtube.video_analytics(channel_id).await {
            Ok(Some(analytics)) => analytics,
            Ok(None) => return Ok(false),
            Err(err) => {
                log_failure(&err, "Failed to refresh YouTube analytics", artist, channel_id);
                return Ok(false);
            }
        };

        let now = Utc::now();
        let has_base_stamp = self
            .repository
            .get_metrics(artist.id)
            .await?
            .is_some_and(|metrics| metrics.refreshed_at.is_some());

        tracing::debug!(
            artist_id = artist.id,
            videos_analyzed = analytics.videos_analyzed,
            avg_views = analytics.average_views,
            "YouTube analytics refreshed"
        );

        self.repository
            .update_metrics(
                artist.id,
                MetricsUpdate {
                    youtube_analytics: Some(analytics),
                    youtube_analytics_refreshed_at: Some(now),
                    refreshed_at: (!has_base_stamp).then_some(now),
                    ..MetricsUpdate::default()
                },
            )
            .await?;

        Ok(true)
    }

    /// Artists without a channel id are left to channel discovery.
    pub async fn needs_refresh(&self, artist: &ArtistRecord) -> Result<bool, ServiceError> {
        if !artist.has_youtube_channel() {
            return Ok(false);
        }

        Ok(match self.repository.get_metrics(artist.id).await? {
            None => true,
            Some(metrics) => metrics.needs_youtube_refresh(Utc::now(), &self.freshness),
        })
    }
}

fn log_failure(err: &ApiError, context: &str, artist: &ArtistRecord, channel_id: &str) {
    tracing::error!(
        artist_id = artist.id,
        channel_id,
        error = %err,
        quota_exhausted = matches!(err, ApiError::QuotaExhausted { .. }),
        "{}",
        context
    );
}
