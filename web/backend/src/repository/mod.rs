pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lineupscout_core::{
    AliasEntry, ArtistId, ArtistRecord, LinkId, LinkRecord, MetricsRecord, MetricsUpdate, NewLink, Platform,
    ReviewStatus, normalize_aliases,
};
use serde::Deserialize;
use thiserror::Error;

pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("artist {0} not found")]
    ArtistNotFound(ArtistId),
    #[error("link {0} not found")]
    LinkNotFound(LinkId),
    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArtist {
    pub name: String,
    pub aliases: Vec<String>,
    pub spotify_id: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub image_url: Option<String>,
    pub genres: Vec<String>,
}

/// Artist fields to overwrite; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistUpdate {
    pub name: Option<String>,
    pub spotify_id: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub image_url: Option<Option<String>>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkUpdate {
    pub url: Option<String>,
    pub review_status: Option<ReviewStatus>,
    pub vevo_checked_at: Option<DateTime<Utc>>,
}

/// Seed file entry. Aliases may be strings or `{ "name": ... }` objects.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistSeed {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
    pub spotify_id: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl From<ArtistSeed> for NewArtist {
    fn from(seed: ArtistSeed) -> Self {
        Self {
            name: seed.name,
            aliases: normalize_aliases(seed.aliases),
            spotify_id: seed.spotify_id,
            youtube_channel_id: seed.youtube_channel_id,
            image_url: seed.image_url,
            genres: seed.genres,
        }
    }
}

/// Artist, metrics and link storage.
///
/// Lookups skip soft-deleted artists except `find_artists_by_external_ids`.
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    async fn find_artist(&self, id: ArtistId) -> Result<Option<ArtistRecord>, RepoError>;

    /// Preserves the order of `ids`; unknown ids are skipped.
    async fn find_artists(&self, ids: &[ArtistId]) -> Result<Vec<ArtistRecord>, RepoError>;

    async fn find_artist_by_external_id(&self, spotify_id: &str) -> Result<Option<ArtistRecord>, RepoError>;

    async fn find_artists_by_external_ids(&self, spotify_ids: &[String]) -> Result<Vec<ArtistRecord>, RepoError>;

    /// Name or alias match, best matches first.
    async fn search_local(&self, query: &str, limit: usize) -> Result<Vec<ArtistRecord>, RepoError>;

    async fn create_artist(&self, artist: NewArtist) -> Result<ArtistRecord, RepoError>;

    async fn update_artist(&self, id: ArtistId, update: ArtistUpdate) -> Result<ArtistRecord, RepoError>;

    async fn get_metrics(&self, artist_id: ArtistId) -> Result<Option<MetricsRecord>, RepoError>;

    async fn get_or_create_metrics(&self, artist_id: ArtistId) -> Result<MetricsRecord, RepoError>;

    /// Creates the record first when the artist has none.
    async fn update_metrics(&self, artist_id: ArtistId, update: MetricsUpdate) -> Result<MetricsRecord, RepoError>;

    async fn get_links_by_platform(&self, artist_id: ArtistId, platform: Platform)
    -> Result<Vec<LinkRecord>, RepoError>;

    async fn create_link(&self, link: NewLink) -> Result<LinkRecord, RepoError>;

    async fn update_link(&self, link_id: LinkId, update: LinkUpdate) -> Result<LinkRecord, RepoError>;

    async fn update_link_checked_timestamp(&self, link_id: LinkId, at: DateTime<Utc>) -> Result<(), RepoError>;
}
