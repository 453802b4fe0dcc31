use std::sync::Arc;

use lineupscout_core::{ArtistRecord, ChannelCandidate};
use rustc_hash::FxHashSet;

use crate::cache::types::DAY;
use crate::cache::{CacheKey, Cached, ResponseCache};
use crate::error::ApiError;
use crate::vevo_detection::VevoDetectionService;
use crate::youtube::YouTubeClient;

const MAX_CANDIDATES: usize = 10;
const RESULTS_PER_QUERY: u32 = 10;

/// Outcome of searching every identity name of one artist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSearch {
    pub candidates: Vec<ChannelCandidate>,
    /// Queries that were skipped or failed.
    pub incomplete_queries: usize,
    /// First quota or rate-limit rejection, if any query hit one.
    pub throttled: Option<ApiError>,
}

impl CandidateSearch {
    pub fn is_complete(&self) -> bool {
        self.incomplete_queries == 0
    }
}

/// Finds YouTube channels that could belong to an artist.
pub struct ChannelSearchService {
    youtube: Arc<YouTubeClient>,
    detection: Arc<VevoDetectionService>,
    cache: ResponseCache,
}

impl ChannelSearchService {
    pub fn new(youtube: Arc<YouTubeClient>, detection: Arc<VevoDetectionService>, cache: ResponseCache) -> Self {
        Self {
            youtube,
            detection,
            cache,
        }
    }

    /// Searches by name and every alias, drops VEVO channels and duplicates, keeps the first ten.
    ///
    /// A failing query does not stop the others. Only complete searches are cached.
    pub async fn search_candidates_for_artist(&self, artist: &ArtistRecord) -> CandidateSearch {
        let cache_key = CacheKey::ChannelSearch(artist.id);
        if let Cached::Hit(candidates) = self.cache.lookup::<Vec<ChannelCandidate>>(&cache_key).await {
            return CandidateSearch {
                candidates,
                ..CandidateSearch::default()
            };
        }

        let mut search = CandidateSearch::default();
        let mut found = Vec::new();

        for query in artist.identity_names() {
            match self.search_by_query(query).await {
                Ok(channels) => found.extend(channels),
                Err(err) => {
                    search.incomplete_queries += 1;
                    match &err {
                        ApiError::QuotaExhausted { .. } | ApiError::RateLimited { .. } => {
                            tracing::warn!(artist_id = artist.id, query, error = %err, "Channel search query skipped");
                            search.throttled.get_or_insert(err);
                        }
                        _ => {
                            tracing::error!(artist_id = artist.id, query, error = %err, "Channel search query failed");
                        }
                    }
                }
            }
        }

        let mut seen = FxHashSet::default();
        search.candidates = found
            .into_iter()
            .filter(|channel| !self.detection.is_vevo_channel(channel))
            .filter(|channel| seen.insert(channel.channel_id().to_string()))
            .take(MAX_CANDIDATES)
            .collect();

        if search.is_complete() {
            self.cache.put(&cache_key, &search.candidates, DAY).await;
        }

        search
    }

    /// One channel search followed by a batched statistics lookup, in search-result order.
    ///
    /// Quota and rate-limit rejections come back as errors.
    pub async fn search_by_query(&self, query: &str) -> Result<Vec<ChannelCandidate>, ApiError> {
        let hits = self.youtube.search_channels(query, RESULTS_PER_QUERY).await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let channel_ids: Vec<String> = hits.iter().map(|hit| hit.channel_id.clone()).collect();
        let mut details = self.youtube.channel_metrics_batch(&channel_ids).await?.channels;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let mut channel = details.remove(&hit.channel_id)?;
                channel.enrich_with_snippet(hit.title.as_deref(), hit.description.as_deref());
                Some(channel)
            })
            .collect())
    }

    pub async fn clear_cache_for_artist(&self, artist: &ArtistRecord) {
        self.cache.forget(&CacheKey::ChannelSearch(artist.id)).await;
    }
}

/// Whether a channel title plausibly names the artist.
///
/// Short titles (three characters or more) contained in the artist name also count.
pub fn validate_ownership(channel: &ChannelCandidate, artist: &ArtistRecord) -> bool {
    let title = channel.title_lowercase();
    let artist_name = artist.name.to_lowercase();

    if title.contains(&artist_name) {
        return true;
    }

    if artist
        .aliases
        .iter()
        .map(|alias| alias.trim())
        .filter(|alias| !alias.is_empty())
        .any(|alias| title.contains(&alias.to_lowercase()))
    {
        return true;
    }

    title.chars().count() >= 3 && artist_name.contains(&title)
}
