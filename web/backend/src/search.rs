use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lineupscout_core::string_normalization::name_matches_query;
use lineupscout_core::{
    ArtistExternalProfile, ArtistId, ArtistRecord, FreshnessConfig, MetricPreset, MetricsRecord, MetricsUpdate,
    calculate_score,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::types::NEGATIVE_TTL;
use crate::cache::{CacheKey, ResponseCache};
use crate::error::{ApiError, ServiceError};
use crate::models::ArtistSearchResult;
use crate::queue::{Job, JobQueue};
use crate::repository::{ArtistRepository, ArtistUpdate, NewArtist};
use crate::scheduler::RefreshScheduler;
use crate::spotify::SpotifyClient;

const MAX_SEARCH_LIMIT: usize = 50;
const RESOLVE_SEARCH_LIMIT: u32 = 5;

/// Hybrid artist search over the local store and Spotify.
pub struct ArtistSearchService {
    spotify: Arc<SpotifyClient>,
    repository: Arc<dyn ArtistRepository>,
    scheduler: Arc<RefreshScheduler>,
    queue: Arc<dyn JobQueue>,
    cache: ResponseCache,
    freshness: FreshnessConfig,
    /// How long a "no Spotify match" answer is remembered
    resolve_miss_ttl: Duration,
}

impl ArtistSearchService {
    pub fn new(
        spotify: Arc<SpotifyClient>,
        repository: Arc<dyn ArtistRepository>,
        scheduler: Arc<RefreshScheduler>,
        queue: Arc<dyn JobQueue>,
        cache: ResponseCache,
        freshness: FreshnessConfig,
        resolve_miss_ttl: Duration,
    ) -> Self {
        Self {
            spotify,
            repository,
            scheduler,
            queue,
            cache,
            freshness,
            resolve_miss_ttl,
        }
    }

    fn should_refresh_youtube(&self, artist: &ArtistRecord, metrics: Option<&MetricsRecord>) -> bool {
        artist.has_youtube_channel()
            && metrics.is_none_or(|metrics| metrics.needs_youtube_refresh(Utc::now(), &self.freshness))
    }

    /// Local matches first, then Spotify matches not stored locally, deduplicated by Spotify id.
    ///
    /// Unknown Spotify artists are queued for creation and stale YouTube data is queued for refresh.
    /// A Spotify failure leaves the local results.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ArtistSearchResult>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let (local, remote) = futures::join!(
            self.repository.search_local(query, limit),
            self.spotify.search_artists(query, limit as u32)
        );
        let local = local?;
        let remote = match remote {
            Ok(artists) => artists,
            Err(err) => {
                tracing::warn!(query, error = %err, "Spotify search failed, using local results only");
                Vec::new()
            }
        };

        let mut merged = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut needs_youtube: Vec<ArtistId> = Vec::new();

        for artist in &local {
            let metrics = self.repository.get_metrics(artist.id).await?;
            let score = calculate_score(metrics.as_ref(), MetricPreset::Balanced);
            let Some(result) = ArtistSearchResult::from_local(artist, metrics.as_ref(), score) else {
                continue;
            };
            seen.insert(result.spotify_id.clone());
            merged.push(result);

            if self.should_refresh_youtube(artist, metrics.as_ref()) {
                needs_youtube.push(artist.id);
            }
        }

        let unseen_ids: Vec<String> = remote
            .iter()
            .filter(|profile| !seen.contains(&profile.spotify_id))
            .map(|profile| profile.spotify_id.clone())
            .collect();
        let known: FxHashMap<String, ArtistRecord> = if unseen_ids.is_empty() {
            FxHashMap::default()
        } else {
            self.repository
                .find_artists_by_external_ids(&unseen_ids)
                .await?
                .into_iter()
                .filter_map(|artist| artist.spotify_id.clone().map(|id| (id, artist)))
                .collect()
        };

        let mut missing: Vec<ArtistExternalProfile> = Vec::new();
        for profile in remote {
            if seen.contains(&profile.spotify_id) {
                continue;
            }
            // Spotify also returns related artists whose names do not contain the query
            if !name_matches_query(&profile.name, query) {
                continue;
            }

            let local_artist = known.get(&profile.spotify_id);
            if local_artist.is_some_and(|artist| artist.deleted) {
                continue;
            }

            merged.push(ArtistSearchResult::from_spotify(&profile, local_artist));
            seen.insert(profile.spotify_id.clone());

            match local_artist {
                None => missing.push(profile),
                Some(artist) => {
                    let metrics = self.repository.get_metrics(artist.id).await?;
                    if self.should_refresh_youtube(artist, metrics.as_ref()) {
                        needs_youtube.push(artist.id);
                    }
                }
            }
        }

        if !missing.is_empty() {
            let count = missing.len();
            match self.queue.enqueue(Job::CreateArtistsFromSpotify { artists: missing }, None).await {
                Ok(()) => tracing::info!(artists_count = count, "Queued artist creation from Spotify"),
                Err(err) => tracing::warn!(artists_count = count, error = %err, "Could not queue artist creation"),
            }
        }

        if !needs_youtube.is_empty() {
            if let Err(err) = self.scheduler.dispatch_priority_jobs(&needs_youtube, true).await {
                tracing::warn!(artist_count = needs_youtube.len(), error = %err, "Could not dispatch YouTube refresh");
            }
        }

        merged.truncate(limit);
        Ok(merged)
    }

    /// Stored artist for a Spotify id, refreshed when stale, or created from Spotify.
    pub async fn get_or_create_from_spotify(&self, spotify_id: &str) -> Result<ArtistRecord, ServiceError> {
        if let Some(artist) = self.repository.find_artist_by_external_id(spotify_id).await? {
            let stale = self
                .repository
                .get_metrics(artist.id)
                .await?
                .is_none_or(|metrics| metrics.is_stale(Utc::now(), &self.freshness));
            if stale {
                return self.refresh_artist_from_spotify(&artist).await;
            }
            return Ok(artist);
        }

        let profile = self
            .spotify
            .artist(spotify_id)
            .await?
            .ok_or_else(|| ServiceError::ArtistNotFound(spotify_id.to_string()))?;
        self.create_from_profile(profile).await
    }

    pub async fn create_from_profile(&self, profile: ArtistExternalProfile) -> Result<ArtistRecord, ServiceError> {
        let artist = self
            .repository
            .create_artist(NewArtist {
                name: profile.name,
                spotify_id: Some(profile.spotify_id),
                image_url: profile.image_url,
                genres: profile.genres,
                ..NewArtist::default()
            })
            .await?;

        self.repository
            .update_metrics(
                artist.id,
                MetricsUpdate {
                    spotify_popularity: Some(profile.popularity),
                    spotify_followers: Some(profile.followers),
                    refreshed_at: Some(Utc::now()),
                    ..MetricsUpdate::default()
                },
            )
            .await?;

        Ok(artist)
    }

    pub async fn refresh_artist_from_spotify(&self, artist: &ArtistRecord) -> Result<ArtistRecord, ServiceError> {
        let Some(spotify_id) = artist.spotify_id.as_deref() else {
            return Err(ServiceError::InvalidArgument(format!(
                "artist {} has no Spotify id",
                artist.id
            )));
        };

        let profile = self
            .spotify
            .artist(spotify_id)
            .await?
            .ok_or_else(|| ServiceError::ArtistNotFound(spotify_id.to_string()))?;

        let updated = self
            .repository
            .update_artist(
                artist.id,
                ArtistUpdate {
                    name: Some(profile.name),
                    image_url: Some(profile.image_url),
                    genres: Some(profile.genres),
                    ..ArtistUpdate::default()
                },
            )
            .await?;

        self.repository
            .update_metrics(
                artist.id,
                MetricsUpdate {
                    spotify_popularity: Some(profile.popularity),
                    spotify_followers: Some(profile.followers),
                    refreshed_at: Some(Utc::now()),
                    ..MetricsUpdate::default()
                },
            )
            .await?;

        Ok(updated)
    }

    /// Finds and stores the Spotify id of an artist by exact (case-insensitive) name.
    ///
    /// Failed lookups are remembered: a miss for the search TTL, an API error for an hour.
    pub async fn resolve_spotify_id(&self, artist: &ArtistRecord) -> Result<Option<String>, ServiceError> {
        if let Some(spotify_id) = artist.spotify_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(Some(spotify_id.to_string()));
        }

        let marker = CacheKey::SpotifyResolveFailed(artist.id);
        if self.cache.store().has(&marker.to_string()).await {
            return Ok(None);
        }

        let candidates = match self.spotify.search_artists(&artist.name, RESOLVE_SEARCH_LIMIT).await {
            Ok(candidates) => candidates,
            Err(err) => {
                log_resolve_error(artist, &err);
                self.cache.put(&marker, &true, NEGATIVE_TTL).await;
                return Ok(None);
            }
        };

        let wanted = artist.name.to_lowercase();
        match candidates.into_iter().find(|profile| profile.name.to_lowercase() == wanted) {
            Some(profile) => {
                self.repository
                    .update_artist(
                        artist.id,
                        ArtistUpdate {
                            spotify_id: Some(profile.spotify_id.clone()),
                            ..ArtistUpdate::default()
                        },
                    )
                    .await?;
                Ok(Some(profile.spotify_id))
            }
            None => {
                self.cache.put(&marker, &true, self.resolve_miss_ttl).await;
                Ok(None)
            }
        }
    }
}

fn log_resolve_error(artist: &ArtistRecord, err: &ApiError) {
    tracing::warn!(
        artist_id = artist.id,
        artist_name = %artist.name,
        error = %err,
        "Spotify API error while resolving artist id"
    );
}
