use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use lineupscout_core::ArtistId;

/// Negative results ("not found", unresolved lookups after an API error) live this long.
pub const NEGATIVE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Every key the services read or write in the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey<'a> {
    SpotifyAccessToken,
    SpotifySearch { query: &'a str, limit: u32 },
    SpotifyArtist(&'a str),
    SpotifyTopTracks { spotify_id: &'a str, market: &'a str, limit: u32 },
    SpotifyAlbums { spotify_id: &'a str, limit: u32, include_groups: &'a str },
    SpotifyRateWindow(&'a str),
    SpotifyResolveFailed(ArtistId),
    YoutubeChannel(&'a str),
    YoutubeVideos { channel_id: &'a str, limit: u32 },
    YoutubeAnalytics(&'a str),
    YoutubeSearch { query: &'a str, max_results: u32 },
    YoutubeQuotaUsage(NaiveDate),
    YoutubeQuotaExhausted,
    ChannelSearch(ArtistId),
    VevoDetection(ArtistId),
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::SpotifyAccessToken => write!(f, "spotify_access_token"),
            CacheKey::SpotifySearch { query, limit } => write!(f, "spotify_search:{}:{}", query, limit),
            CacheKey::SpotifyArtist(id) => write!(f, "spotify_artist:{}", id),
            CacheKey::SpotifyTopTracks { spotify_id, market, limit } => {
                write!(f, "spotify_top_tracks:{}:{}:{}", spotify_id, market, limit)
            }
            CacheKey::SpotifyAlbums { spotify_id, limit, include_groups } => {
                write!(f, "spotify_albums:{}:{}:{}", spotify_id, limit, include_groups)
            }
            CacheKey::SpotifyRateWindow(minute) => write!(f, "spotify_rate_limit:{}", minute),
            CacheKey::SpotifyResolveFailed(artist_id) => write!(f, "spotify_resolve_failed:{}", artist_id),
            CacheKey::YoutubeChannel(id) => write!(f, "youtube_channel:{}", id),
            CacheKey::YoutubeVideos { channel_id, limit } => write!(f, "youtube_videos:{}:{}", channel_id, limit),
            CacheKey::YoutubeAnalytics(id) => write!(f, "youtube_analytics:{}", id),
            CacheKey::YoutubeSearch { query, max_results } => {
                write!(f, "youtube_search:{}:{}", query, max_results)
            }
            CacheKey::YoutubeQuotaUsage(date) => write!(f, "youtube_quota_usage:{}", date.format("%Y-%m-%d")),
            CacheKey::YoutubeQuotaExhausted => write!(f, "youtube_quota_exhausted"),
            CacheKey::ChannelSearch(artist_id) => write!(f, "channel_search:{}", artist_id),
            CacheKey::VevoDetection(artist_id) => write!(f, "vevo_detection:{}", artist_id),
        }
    }
}

/// Search terms are cached case- and whitespace-insensitively.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
