use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::artist::ArtistId;
use crate::channel::VideoAnalytics;

/// Freshness windows for persisted metrics.
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Overall record age before Spotify data is refreshed
    pub general_max_age: TimeDelta,
    /// Channel subscriber data
    pub basic_max_age: TimeDelta,
    /// Video averages
    pub analytics_max_age: TimeDelta,
}

impl FreshnessConfig {
    pub fn new(general_max_age: TimeDelta, basic_max_age: TimeDelta, analytics_max_age: TimeDelta) -> Self {
        Self {
            general_max_age,
            basic_max_age,
            analytics_max_age,
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            general_max_age: TimeDelta::hours(24),
            basic_max_age: TimeDelta::hours(24),
            analytics_max_age: TimeDelta::days(7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub artist_id: ArtistId,
    pub spotify_popularity: Option<u8>,
    pub spotify_followers: Option<u64>,
    pub youtube_subscribers: Option<u64>,
    pub youtube_avg_views: Option<f64>,
    pub youtube_avg_likes: Option<f64>,
    pub youtube_avg_comments: Option<f64>,
    pub youtube_videos_analyzed: Option<u32>,
    pub instagram_followers: Option<u64>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub youtube_refreshed_at: Option<DateTime<Utc>>,
    pub youtube_analytics_refreshed_at: Option<DateTime<Utc>>,
}

fn is_older_than(stamp: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
    stamp.is_none_or(|at| at < now - max_age)
}

impl MetricsRecord {
    pub fn new(artist_id: ArtistId) -> Self {
        Self {
            artist_id,
            spotify_popularity: None,
            spotify_followers: None,
            youtube_subscribers: None,
            youtube_avg_views: None,
            youtube_avg_likes: None,
            youtube_avg_comments: None,
            youtube_videos_analyzed: None,
            instagram_followers: None,
            refreshed_at: None,
            youtube_refreshed_at: None,
            youtube_analytics_refreshed_at: None,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, freshness: &FreshnessConfig) -> bool {
        is_older_than(self.refreshed_at, now, freshness.general_max_age)
    }

    pub fn is_youtube_stale(&self, now: DateTime<Utc>, freshness: &FreshnessConfig) -> bool {
        is_older_than(self.youtube_refreshed_at, now, freshness.basic_max_age)
    }

    pub fn is_youtube_analytics_stale(&self, now: DateTime<Utc>, freshness: &FreshnessConfig) -> bool {
        is_older_than(self.youtube_analytics_refreshed_at, now, freshness.analytics_max_age)
    }

    pub fn has_youtube_data(&self) -> bool {
        self.youtube_subscribers.is_some()
    }

    pub fn has_youtube_analytics(&self) -> bool {
        self.youtube_analytics_refreshed_at.is_some()
    }

    pub fn needs_youtube_refresh(&self, now: DateTime<Utc>, freshness: &FreshnessConfig) -> bool {
        self.is_youtube_stale(now, freshness) || self.is_youtube_analytics_stale(now, freshness)
    }

    pub fn apply(&mut self, update: &MetricsUpdate) {
        if let Some(popularity) = update.spotify_popularity {
            self.spotify_popularity = Some(popularity);
        }
        if let Some(followers) = update.spotify_followers {
            self.spotify_followers = Some(followers);
        }
        if let Some(subscribers) = update.youtube_subscribers {
            self.youtube_subscribers = subscribers;
        }
        if let Some(analytics) = &update.youtube_analytics {
            self.youtube_avg_views = Some(analytics.average_views);
            self.youtube_avg_likes = Some(analytics.average_likes);
            self.youtube_avg_comments = Some(analytics.average_comments);
            self.youtube_videos_analyzed = Some(analytics.videos_analyzed);
        }
        if let Some(at) = update.refreshed_at {
            self.refreshed_at = Some(at);
        }
        if let Some(at) = update.youtube_refreshed_at {
            self.youtube_refreshed_at = Some(at);
        }
        if let Some(at) = update.youtube_analytics_refreshed_at {
            self.youtube_analytics_refreshed_at = Some(at);
        }
    }
}

/// A partial write to a metrics record; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsUpdate {
    pub spotify_popularity: Option<u8>,
    pub spotify_followers: Option<u64>,
    /// `Some(None)` clears the subscriber count.
    pub youtube_subscribers: Option<Option<u64>>,
    pub youtube_analytics: Option<VideoAnalytics>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub youtube_refreshed_at: Option<DateTime<Utc>>,
    pub youtube_analytics_refreshed_at: Option<DateTime<Utc>>,
}
