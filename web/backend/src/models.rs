use lineupscout_core::{ArtistExternalProfile, ArtistId, ArtistRecord, MetricsRecord};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Local,
    Spotify,
}

/// One row of a hybrid artist search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSearchResult {
    pub spotify_id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub popularity: Option<u8>,
    pub followers: Option<u64>,
    pub exists_in_database: bool,
    pub database_id: Option<ArtistId>,
    pub source: ResultSource,
    /// Balanced-preset score, only for artists already stored locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl ArtistSearchResult {
    /// `None` for local artists without a Spotify id.
    pub fn from_local(artist: &ArtistRecord, metrics: Option<&MetricsRecord>, score: u32) -> Option<Self> {
        Some(Self {
            spotify_id: artist.spotify_id.clone()?,
            name: artist.name.clone(),
            genres: artist.genres.clone(),
            image_url: artist.image_url.clone(),
            popularity: metrics.and_then(|m| m.spotify_popularity),
            followers: metrics.and_then(|m| m.spotify_followers),
            exists_in_database: true,
            database_id: Some(artist.id),
            source: ResultSource::Local,
            score: Some(score),
        })
    }

    pub fn from_spotify(profile: &ArtistExternalProfile, local: Option<&ArtistRecord>) -> Self {
        Self {
            spotify_id: profile.spotify_id.clone(),
            name: profile.name.clone(),
            genres: profile.genres.clone(),
            image_url: profile.image_url.clone(),
            popularity: Some(profile.popularity),
            followers: Some(profile.followers),
            exists_in_database: local.is_some(),
            database_id: local.map(|artist| artist.id),
            source: ResultSource::Spotify,
            score: None,
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ArtistSearchResult>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Deserialize, Default)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub artist_id: ArtistId,
    pub refreshed: bool,
    pub metrics: Option<MetricsRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub artist_ids: Vec<ArtistId>,
    #[serde(default = "default_respect_quota")]
    pub respect_quota: bool,
}

fn default_respect_quota() -> bool {
    true
}

#[derive(Serialize)]
pub struct QueuedResponse {
    pub operation: &'static str,
    pub artist_id: ArtistId,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
