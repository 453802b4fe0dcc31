use std::sync::Arc;

use lineupscout_core::{ChannelCandidate, VideoAnalytics, VideoStatistics};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Deserializer, Serialize};

use crate::cache::types::{NEGATIVE_TTL, normalize_query};
use crate::cache::{CacheKey, Cached, KeyValueStore, ResponseCache};
use crate::config::YouTubeConfig;
use crate::error::{ApiError, CallOutcome};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy, send_with_retry};
use crate::quota::QuotaLedger;

const SERVICE: &str = "youtube";
/// Most ids accepted by one list call.
pub const MAX_BATCH_SIZE: usize = 50;
pub const LIST_COST: u32 = 1;
pub const SEARCH_COST: u32 = 100;
const QUOTA_REASONS: [&str; 2] = ["quotaExceeded", "dailyLimitExceeded"];

/// YouTube sends counters as strings; accept numbers too.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Count>::deserialize(deserializer)? {
        Some(Count::Text(text)) => text.parse().ok(),
        Some(Count::Number(number)) => Some(number),
        None => None,
    })
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    #[serde(default, deserialize_with = "count")]
    subscriber_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    video_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    view_count: Option<u64>,
    #[serde(default)]
    hidden_subscriber_count: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    #[serde(default)]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    snippet: Option<Snippet>,
    #[serde(default)]
    statistics: ChannelStatistics,
    #[serde(default)]
    content_details: ChannelContentDetails,
}

impl From<ChannelItem> for ChannelCandidate {
    fn from(item: ChannelItem) -> Self {
        let snippet = item.snippet.unwrap_or_default();
        let mut channel = ChannelCandidate::new(item.id);
        channel.subscriber_count = item.statistics.subscriber_count.unwrap_or(0);
        channel.video_count = item.statistics.video_count.unwrap_or(0);
        channel.view_count = item.statistics.view_count.unwrap_or(0);
        channel.subscriber_count_hidden = item.statistics.hidden_subscriber_count;
        channel.uploads_playlist_id = item.content_details.related_playlists.uploads;
        channel.title = snippet.title;
        channel.description = snippet.description;
        channel
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoCounters {
    #[serde(default, deserialize_with = "count")]
    view_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    like_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    comment_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: VideoCounters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchResultId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

fn is_quota_rejection(response: &HttpResponse) -> bool {
    match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => envelope
            .error
            .errors
            .iter()
            .filter_map(|detail| detail.reason.as_deref())
            .any(|reason| QUOTA_REASONS.contains(&reason)),
        Err(_) => QUOTA_REASONS.iter().any(|reason| response.body.contains(reason)),
    }
}

/// A channel returned by a search query, before statistics are fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSearchHit {
    pub channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Result of a channel statistics batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelBatch {
    pub channels: FxHashMap<String, ChannelCandidate>,
    /// Ids YouTube reported as missing, now or in a cached answer.
    pub not_found: Vec<String>,
    /// Ids left unanswered because the quota ran out or the request failed.
    pub unresolved: Vec<String>,
}

impl ChannelBatch {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    fn with_unresolved(mut self, channel_ids: &[&str]) -> Self {
        self.unresolved = channel_ids.iter().map(|id| id.to_string()).collect();
        self
    }
}

/// Client for the YouTube Data API v3, metered against the daily quota.
pub struct YouTubeClient {
    config: YouTubeConfig,
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    quota: QuotaLedger,
    retry: RetryPolicy,
}

impl YouTubeClient {
    pub fn new(
        config: YouTubeConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let quota = QuotaLedger::new(store.clone(), config.quota_limit);

        Ok(Self {
            config,
            transport,
            cache: ResponseCache::new(store),
            quota,
            retry,
        })
    }

    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    /// One quota-checked, quota-tracked GET. Nothing is sent when the budget cannot cover `cost`.
    async fn metered_get(&self, endpoint: &str, params: &[(&str, String)], cost: u32) -> CallOutcome<HttpResponse> {
        if !self.quota.check_availability(cost).await {
            tracing::warn!(endpoint, cost, "YouTube quota unavailable, skipping request");
            return CallOutcome::QuotaExhausted { cost };
        }
        self.quota.track(cost).await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let request = params
            .iter()
            .fold(HttpRequest::get(url), |request, (name, value)| request.query(name, value))
            .query("key", &self.config.api_key);

        let response = match send_with_retry(self.transport.as_ref(), &request, &self.retry, SERVICE).await {
            Ok(response) => response,
            Err(err) => return CallOutcome::Failed(err),
        };

        match response.status {
            status if (200..300).contains(&status) => CallOutcome::Success(response),
            404 => {
                tracing::info!(endpoint, "YouTube resource not found");
                CallOutcome::NotFound
            }
            403 if is_quota_rejection(&response) => {
                tracing::warn!(endpoint, "YouTube rejected request: quota exceeded");
                self.quota.mark_exhausted().await;
                CallOutcome::QuotaExhausted { cost }
            }
            429 => {
                let retry_after = response.retry_after();
                tracing::warn!(endpoint, retry_after_secs = retry_after.as_secs(), "YouTube rate limited the request");
                CallOutcome::RateLimited { retry_after }
            }
            status => {
                tracing::error!(endpoint, status, "YouTube request failed");
                CallOutcome::Failed(ApiError::Http {
                    status,
                    message: response.summary(),
                })
            }
        }
    }

    pub async fn channel_metrics(&self, channel_id: &str) -> Result<Option<ChannelCandidate>, ApiError> {
        let mut batch = self.channel_metrics_batch(&[channel_id.to_string()]).await?;
        Ok(batch.channels.remove(channel_id))
    }

    /// Statistics for up to 50 channels.
    ///
    /// Cached entries are always returned. Provider failures and an exhausted
    /// quota leave only the cached part, with the rest listed as unresolved.
    pub async fn channel_metrics_batch(&self, channel_ids: &[String]) -> Result<ChannelBatch, ApiError> {
        if channel_ids.len() > MAX_BATCH_SIZE {
            return Err(ApiError::InvalidArgument(format!(
                "at most {} channel ids per request, got {}",
                MAX_BATCH_SIZE,
                channel_ids.len()
            )));
        }

        let mut batch = ChannelBatch::default();
        let mut uncached: Vec<&str> = Vec::new();
        let mut seen = FxHashSet::default();

        for channel_id in channel_ids {
            if !seen.insert(channel_id.as_str()) {
                continue;
            }
            match self.cache.lookup::<ChannelCandidate>(&CacheKey::YoutubeChannel(channel_id)).await {
                Cached::Hit(channel) => {
                    batch.channels.insert(channel_id.clone(), channel);
                }
                Cached::NotFound => batch.not_found.push(channel_id.clone()),
                Cached::Miss => uncached.push(channel_id),
            }
        }

        if uncached.is_empty() {
            return Ok(batch);
        }

        if self.quota.is_exhausted().await {
            tracing::info!(
                requested = channel_ids.len(),
                cached = batch.channels.len(),
                "YouTube quota exhausted, returning cached channels only"
            );
            return Ok(batch.with_unresolved(&uncached));
        }

        let params = [
            ("part", "statistics,contentDetails".to_string()),
            ("id", uncached.join(",")),
        ];

        match self.metered_get("channels", &params, LIST_COST).await {
            CallOutcome::Success(response) => {
                let parsed = match response.json::<ListResponse<ChannelItem>>() {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::error!(error = %e, "Unreadable YouTube channels response");
                        return Ok(batch.with_unresolved(&uncached));
                    }
                };

                for item in parsed.items {
                    let channel = ChannelCandidate::from(item);
                    self.cache
                        .put(&CacheKey::YoutubeChannel(channel.channel_id()), &channel, self.config.cache_ttl)
                        .await;
                    batch.channels.insert(channel.channel_id().to_string(), channel);
                }

                for channel_id in uncached {
                    if !batch.channels.contains_key(channel_id) {
                        tracing::info!(channel_id, "YouTube channel not found");
                        self.cache
                            .put_not_found(&CacheKey::YoutubeChannel(channel_id), NEGATIVE_TTL)
                            .await;
                        batch.not_found.push(channel_id.to_string());
                    }
                }
                Ok(batch)
            }
            CallOutcome::NotFound => {
                for channel_id in uncached {
                    self.cache
                        .put_not_found(&CacheKey::YoutubeChannel(channel_id), NEGATIVE_TTL)
                        .await;
                    batch.not_found.push(channel_id.to_string());
                }
                Ok(batch)
            }
            CallOutcome::QuotaExhausted { .. } | CallOutcome::RateLimited { .. } => {
                tracing::warn!(
                    requested = channel_ids.len(),
                    cached = batch.channels.len(),
                    "YouTube channel fetch throttled, returning cached channels only"
                );
                Ok(batch.with_unresolved(&uncached))
            }
            CallOutcome::Failed(e) => {
                tracing::error!(error = %e, "YouTube channel fetch failed, returning cached channels only");
                Ok(batch.with_unresolved(&uncached))
            }
        }
    }

    /// Ids of the channel's most recent uploads.
    pub async fn channel_videos(&self, channel_id: &str, limit: u32) -> Result<Vec<String>, ApiError> {
        let limit = limit.clamp(1, MAX_BATCH_SIZE as u32);
        let cache_key = CacheKey::YoutubeVideos { channel_id, limit };

        if let Cached::Hit(video_ids) = self.cache.lookup(&cache_key).await {
            return Ok(video_ids);
        }

        let Some(uploads) = self
            .channel_metrics(channel_id)
            .await?
            .and_then(|channel| channel.uploads_playlist_id)
        else {
            return Ok(Vec::new());
        };

        let params = [
            ("part", "contentDetails".to_string()),
            ("playlistId", uploads),
            ("maxResults", limit.to_string()),
        ];

        match self.metered_get("playlistItems", &params, LIST_COST).await {
            CallOutcome::Success(response) => {
                let video_ids: Vec<String> = response
                    .json::<ListResponse<PlaylistItem>>()?
                    .items
                    .into_iter()
                    .filter_map(|item| item.content_details.and_then(|d| d.video_id))
                    .collect();
                self.cache.put(&cache_key, &video_ids, self.config.cache_ttl).await;
                Ok(video_ids)
            }
            other => {
                tracing::warn!(channel_id, outcome = ?other.map(|_| ()), "Could not list channel uploads");
                Ok(Vec::new())
            }
        }
    }

    /// View/like/comment counts for up to 50 videos; videos without a view count are skipped.
    pub async fn video_statistics(&self, video_ids: &[String]) -> Result<Vec<VideoStatistics>, ApiError> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        if video_ids.len() > MAX_BATCH_SIZE {
            return Err(ApiError::InvalidArgument(format!(
                "at most {} video ids per request, got {}",
                MAX_BATCH_SIZE,
                video_ids.len()
            )));
        }

        let params = [("part", "statistics".to_string()), ("id", video_ids.join(","))];

        match self.metered_get("videos", &params, LIST_COST).await {
            CallOutcome::Success(response) => Ok(response
                .json::<ListResponse<VideoItem>>()?
                .items
                .into_iter()
                .filter_map(|item| {
                    let views = item.statistics.view_count?;
                    Some(VideoStatistics {
                        video_id: item.id,
                        view_count: views,
                        like_count: item.statistics.like_count.unwrap_or(0),
                        comment_count: item.statistics.comment_count.unwrap_or(0),
                    })
                })
                .collect()),
            other => {
                tracing::warn!(videos = video_ids.len(), outcome = ?other.map(|_| ()), "Could not fetch video statistics");
                Ok(Vec::new())
            }
        }
    }

    /// Averages over the channel's recent uploads; `None` when nothing could be analysed.
    pub async fn video_analytics(&self, channel_id: &str) -> Result<Option<VideoAnalytics>, ApiError> {
        let cache_key = CacheKey::YoutubeAnalytics(channel_id);

        if let Cached::Hit(analytics) = self.cache.lookup(&cache_key).await {
            return Ok(Some(analytics));
        }

        let video_ids = self
            .channel_videos(channel_id, self.config.analytics_sample_size)
            .await?;
        if video_ids.is_empty() {
            return Ok(None);
        }

        let statistics = self.video_statistics(&video_ids).await?;
        let analytics = VideoAnalytics::from_videos(&statistics);

        if let Some(analytics) = &analytics {
            self.cache
                .put(&cache_key, analytics, self.config.analytics_cache_ttl)
                .await;
        }
        Ok(analytics)
    }

    /// Channel search (100 quota units). Throttling and failures are returned as errors.
    pub async fn search_channels(&self, query: &str, max_results: u32) -> Result<Vec<ChannelSearchHit>, ApiError> {
        let query = query.trim();
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let max_results = max_results.clamp(1, MAX_BATCH_SIZE as u32);
        let cache_key = CacheKey::YoutubeSearch {
            query: &normalized,
            max_results,
        };

        if let Cached::Hit(hits) = self.cache.lookup(&cache_key).await {
            return Ok(hits);
        }

        let params = [
            ("part", "snippet".to_string()),
            ("type", "channel".to_string()),
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
        ];

        let Some(response) = self
            .metered_get("search", &params, SEARCH_COST)
            .await
            .into_result()?
        else {
            return Ok(Vec::new());
        };

        let hits: Vec<ChannelSearchHit> = response
            .json::<ListResponse<SearchItem>>()?
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet.unwrap_or_default();
                Some(ChannelSearchHit {
                    channel_id: item.id.channel_id?,
                    title: snippet.title,
                    description: snippet.description,
                })
            })
            .collect();

        self.cache.put(&cache_key, &hits, self.config.cache_ttl).await;
        Ok(hits)
    }
}
