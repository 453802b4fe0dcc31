use std::sync::Arc;

use lineupscout_core::ArtistExternalProfile;
use serde::{Deserialize, Serialize};

use crate::cache::types::{NEGATIVE_TTL, normalize_query};
use crate::cache::{CacheKey, Cached, KeyValueStore, ResponseCache};
use crate::config::SpotifyConfig;
use crate::error::{ApiError, CallOutcome};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy, send_with_retry};
use crate::rate_limit::RateLimiter;

const SERVICE: &str = "spotify";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    artists: Paging<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyFollowers {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    popularity: Option<u8>,
    followers: Option<SpotifyFollowers>,
}

impl From<SpotifyArtist> for ArtistExternalProfile {
    fn from(artist: SpotifyArtist) -> Self {
        Self {
            spotify_id: artist.id,
            name: artist.name,
            genres: artist.genres,
            image_url: artist.images.into_iter().next().map(|image| image.url),
            popularity: artist.popularity.unwrap_or(0).min(100),
            followers: artist.followers.and_then(|f| f.total).unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    album: Option<AlbumRef>,
    duration_ms: Option<u64>,
    preview_url: Option<String>,
    external_urls: Option<ExternalUrls>,
    #[serde(default)]
    artists: Vec<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    id: String,
    name: String,
    album_type: Option<String>,
    release_date: Option<String>,
    total_tracks: Option<u32>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub spotify_id: String,
    pub name: String,
    pub album_name: String,
    pub album_image_url: Option<String>,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub artists: Vec<String>,
}

impl From<SpotifyTrack> for TrackSummary {
    fn from(track: SpotifyTrack) -> Self {
        let (album_name, album_image_url) = match track.album {
            Some(album) => (album.name, album.images.into_iter().next().map(|i| i.url)),
            None => ("Unknown Album".to_string(), None),
        };
        Self {
            spotify_id: track.id,
            name: track.name,
            album_name,
            album_image_url,
            duration_ms: track.duration_ms.unwrap_or(0),
            preview_url: track.preview_url,
            external_url: track.external_urls.and_then(|u| u.spotify),
            artists: track.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub spotify_id: String,
    pub name: String,
    pub album_type: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
}

impl From<SpotifyAlbum> for AlbumSummary {
    fn from(album: SpotifyAlbum) -> Self {
        Self {
            spotify_id: album.id,
            name: album.name,
            album_type: album.album_type.unwrap_or_else(|| "album".to_string()),
            release_date: album.release_date.unwrap_or_default(),
            total_tracks: album.total_tracks.unwrap_or(0),
            image_url: album.images.into_iter().next().map(|i| i.url),
            external_url: album.external_urls.and_then(|u| u.spotify),
        }
    }
}

/// Client for the Spotify Web API using the client-credentials flow.
pub struct SpotifyClient {
    config: SpotifyConfig,
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(
        config: SpotifyConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let rate_limiter = RateLimiter::new(store.clone(), config.rate_limit_per_minute);

        Ok(Self {
            config,
            transport,
            cache: ResponseCache::new(store),
            rate_limiter,
            retry,
        })
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        // Check cache first
        if let Cached::Hit(token) = self.cache.lookup::<String>(&CacheKey::SpotifyAccessToken).await {
            return Ok(token);
        }

        let request = HttpRequest::post_form(
            &self.config.auth_url,
            vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), self.config.client_id.clone()),
                ("client_secret".to_string(), self.config.client_secret.clone()),
            ],
        );
        let response = send_with_retry(self.transport.as_ref(), &request, &self.retry, SERVICE).await?;

        if !response.is_success() {
            tracing::error!(status = response.status, "Spotify authentication failed");
            return Err(match response.status {
                400 | 401 | 403 => ApiError::Unauthorized,
                status => ApiError::Http {
                    status,
                    message: response.summary(),
                },
            });
        }

        let token: TokenResponse = response.json()?;
        self.cache
            .put(&CacheKey::SpotifyAccessToken, &token.access_token, self.config.token_cache_ttl)
            .await;
        Ok(token.access_token)
    }

    /// Authenticated GET against the API; a rejected token is refreshed once.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> CallOutcome<HttpResponse> {
        if let Err(err) = self.rate_limiter.check_and_increment().await {
            return match err {
                ApiError::RateLimited { retry_after } => CallOutcome::RateLimited { retry_after },
                other => CallOutcome::Failed(other),
            };
        }

        let url = format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path);
        let mut token_refreshed = false;

        loop {
            let token = match self.access_token().await {
                Ok(token) => token,
                Err(err) => return CallOutcome::Failed(err),
            };

            let request = query
                .iter()
                .fold(HttpRequest::get(&url).bearer(&token), |request, (name, value)| {
                    request.query(name, value)
                });

            let response = match send_with_retry(self.transport.as_ref(), &request, &self.retry, SERVICE).await {
                Ok(response) => response,
                Err(err) => return CallOutcome::Failed(err),
            };

            match response.status {
                status if (200..300).contains(&status) => return CallOutcome::Success(response),
                401 => {
                    self.cache.forget(&CacheKey::SpotifyAccessToken).await;
                    if token_refreshed {
                        tracing::error!(path, "Spotify rejected a freshly issued token");
                        return CallOutcome::Failed(ApiError::Unauthorized);
                    }
                    tracing::warn!(path, "Spotify token rejected, fetching a new one");
                    token_refreshed = true;
                }
                404 => {
                    tracing::info!(path, "Spotify resource not found");
                    return CallOutcome::NotFound;
                }
                429 => {
                    let retry_after = response.retry_after();
                    tracing::warn!(path, retry_after_secs = retry_after.as_secs(), "Spotify rate limited the request");
                    return CallOutcome::RateLimited { retry_after };
                }
                status => {
                    tracing::error!(path, status, "Spotify request failed");
                    return CallOutcome::Failed(ApiError::Http {
                        status,
                        message: response.summary(),
                    });
                }
            }
        }
    }

    pub async fn search_artists(&self, query: &str, limit: u32) -> Result<Vec<ArtistExternalProfile>, ApiError> {
        let limit = limit.clamp(1, 50);
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let cache_key = CacheKey::SpotifySearch {
            query: &normalized,
            limit,
        };

        if let Cached::Hit(artists) = self.cache.lookup(&cache_key).await {
            return Ok(artists);
        }

        let outcome = self
            .get(
                "/search",
                &[
                    ("q", query.trim().to_string()),
                    ("type", "artist".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await;

        let artists: Vec<ArtistExternalProfile> = match outcome.into_result()? {
            Some(response) => response
                .json::<SearchResponse>()?
                .artists
                .items
                .into_iter()
                .map(ArtistExternalProfile::from)
                .collect(),
            None => Vec::new(),
        };

        self.cache
            .put(&cache_key, &artists, self.config.search_cache_ttl)
            .await;
        Ok(artists)
    }

    /// `None` when Spotify has no such artist; that answer is cached for an hour.
    pub async fn artist(&self, spotify_id: &str) -> Result<Option<ArtistExternalProfile>, ApiError> {
        let spotify_id = spotify_id.trim();
        if spotify_id.is_empty() {
            return Err(ApiError::InvalidArgument("empty Spotify artist id".to_string()));
        }
        let cache_key = CacheKey::SpotifyArtist(spotify_id);

        match self.cache.lookup::<ArtistExternalProfile>(&cache_key).await {
            Cached::Hit(artist) => return Ok(Some(artist)),
            Cached::NotFound => return Ok(None),
            Cached::Miss => {}
        }

        let path = format!("/artists/{}", urlencoding::encode(spotify_id));
        match self.get(&path, &[]).await.into_result()? {
            Some(response) => {
                let artist = ArtistExternalProfile::from(response.json::<SpotifyArtist>()?);
                self.cache
                    .put(&cache_key, &artist, self.config.search_cache_ttl)
                    .await;
                Ok(Some(artist))
            }
            None => {
                self.cache.put_not_found(&cache_key, NEGATIVE_TTL).await;
                Ok(None)
            }
        }
    }

    pub async fn top_tracks(&self, spotify_id: &str, market: &str, limit: u32) -> Result<Vec<TrackSummary>, ApiError> {
        let limit = limit.clamp(1, 10);
        let cache_key = CacheKey::SpotifyTopTracks {
            spotify_id,
            market,
            limit,
        };

        if let Cached::Hit(tracks) = self.cache.lookup(&cache_key).await {
            return Ok(tracks);
        }

        let path = format!("/artists/{}/top-tracks", urlencoding::encode(spotify_id));
        let tracks: Vec<TrackSummary> = match self.get(&path, &[("market", market.to_string())]).await.into_result()? {
            Some(response) => response
                .json::<TopTracksResponse>()?
                .tracks
                .into_iter()
                .take(limit as usize)
                .map(TrackSummary::from)
                .collect(),
            None => Vec::new(),
        };

        self.cache
            .put(&cache_key, &tracks, self.config.search_cache_ttl)
            .await;
        Ok(tracks)
    }

    pub async fn albums(&self, spotify_id: &str, limit: u32, include_groups: &str) -> Result<Vec<AlbumSummary>, ApiError> {
        let limit = limit.clamp(1, 20);
        let cache_key = CacheKey::SpotifyAlbums {
            spotify_id,
            limit,
            include_groups,
        };

        if let Cached::Hit(albums) = self.cache.lookup(&cache_key).await {
            return Ok(albums);
        }

        let path = format!("/artists/{}/albums", urlencoding::encode(spotify_id));
        let query = [
            ("include_groups", include_groups.to_string()),
            ("limit", limit.to_string()),
        ];
        let albums: Vec<AlbumSummary> = match self.get(&path, &query).await.into_result()? {
            Some(response) => response
                .json::<Paging<SpotifyAlbum>>()?
                .items
                .into_iter()
                .map(AlbumSummary::from)
                .collect(),
            None => Vec::new(),
        };

        self.cache
            .put(&cache_key, &albums, self.config.search_cache_ttl)
            .await;
        Ok(albums)
    }

    pub async fn clear_search_cache(&self, query: &str, limit: u32) {
        let normalized = normalize_query(query);
        self.cache
            .forget(&CacheKey::SpotifySearch {
                query: &normalized,
                limit: limit.clamp(1, 50),
            })
            .await;
    }

    pub async fn clear_artist_cache(&self, spotify_id: &str) {
        self.cache.forget(&CacheKey::SpotifyArtist(spotify_id.trim())).await;
    }
}
