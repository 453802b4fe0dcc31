use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lineupscout_core::{FreshnessConfig, RankingConfig, VevoConfig};

use crate::error::ConfigError;
use crate::http::RetryPolicy;

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub auth_url: String,
    pub token_cache_ttl: Duration,
    pub search_cache_ttl: Duration,
    pub rate_limit_per_minute: u32,
}

impl SpotifyConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            auth_url: "https://accounts.spotify.com/api/token".to_string(),
            token_cache_ttl: Duration::from_secs(3600),
            search_cache_ttl: Duration::from_secs(86_400),
            rate_limit_per_minute: 180,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_CLIENT_ID"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_API_BASE_URL"));
        }
        if self.auth_url.trim().is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_AUTH_URL"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: String,
    pub base_url: String,
    pub quota_limit: u32,
    pub cache_ttl: Duration,
    pub analytics_cache_ttl: Duration,
    /// Recent uploads averaged for video analytics
    pub analytics_sample_size: u32,
}

impl YouTubeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            quota_limit: 10_000,
            cache_ttl: Duration::from_secs(86_400),
            analytics_cache_ttl: Duration::from_secs(604_800),
            analytics_sample_size: 15,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("YOUTUBE_API_KEY"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("YOUTUBE_BASE_URL"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub youtube: YouTubeConfig,
    pub vevo: VevoConfig,
    pub ranking: RankingConfig,
    pub freshness: FreshnessConfig,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub bind_addr: String,
    /// JSON file of artists loaded into the in-memory repository at startup
    pub seed_path: Option<PathBuf>,
    /// Binary snapshot of the in-memory repository
    pub snapshot_path: Option<PathBuf>,
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn string_or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn seconds_or(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse_or(name, default).map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let spotify = SpotifyConfig {
            client_id: env.required("SPOTIFY_CLIENT_ID")?,
            client_secret: env.required("SPOTIFY_CLIENT_SECRET")?,
            api_base_url: env.string_or("SPOTIFY_API_BASE_URL", "https://api.spotify.com/v1"),
            auth_url: env.string_or("SPOTIFY_AUTH_URL", "https://accounts.spotify.com/api/token"),
            token_cache_ttl: env.seconds_or("SPOTIFY_TOKEN_CACHE_TTL", 3600)?,
            search_cache_ttl: env.seconds_or("SPOTIFY_SEARCH_CACHE_TTL", 86_400)?,
            rate_limit_per_minute: env.parse_or("SPOTIFY_RATE_LIMIT", 180)?,
        };

        let youtube = YouTubeConfig {
            api_key: env.required("YOUTUBE_API_KEY")?,
            base_url: env.string_or("YOUTUBE_BASE_URL", "https://www.googleapis.com/youtube/v3"),
            quota_limit: env.parse_or("YOUTUBE_QUOTA_LIMIT", 10_000)?,
            cache_ttl: env.seconds_or("YOUTUBE_CACHE_TTL", 86_400)?,
            analytics_cache_ttl: env.seconds_or("YOUTUBE_VIDEO_ANALYTICS_CACHE_TTL", 604_800)?,
            analytics_sample_size: env.parse_or("YOUTUBE_VIDEO_ANALYTICS_SAMPLE_SIZE", 15)?,
        };

        let vevo = VevoConfig::new(
            env.parse_or("YOUTUBE_VEVO_DETECTION_ENABLED", true)?,
            env.parse_or("YOUTUBE_VEVO_RECHECK_DAYS", 7)?,
            env.seconds_or("YOUTUBE_VEVO_CACHE_TTL", 604_800)?,
        );

        let ranking = RankingConfig::new(
            env.parse_or("YOUTUBE_MINIMUM_SUBSCRIBERS", 1000)?,
            env.parse_or("YOUTUBE_VERIFIED_BONUS_PERCENT", 20.0)?,
            env.parse_or("YOUTUBE_ACTIVITY_BONUS_PERCENT", 10.0)?,
            env.parse_or("YOUTUBE_OFFICIAL_BONUS_PERCENT", 15.0)?,
        );

        let retry = RetryPolicy::new(
            env.parse_or("HTTP_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(env.parse_or("HTTP_RETRY_BASE_MS", 1000)?),
        );

        Ok(Self {
            spotify,
            youtube,
            vevo,
            ranking,
            freshness: FreshnessConfig::default(),
            retry,
            http_timeout: env.seconds_or("HTTP_TIMEOUT_SECS", 10)?,
            bind_addr: env.string_or("BIND_ADDR", "0.0.0.0:3000"),
            seed_path: env.optional("ARTIST_SEED_PATH").map(PathBuf::from),
            snapshot_path: env.optional("REPOSITORY_SNAPSHOT_PATH").map(PathBuf::from),
        })
    }
}
