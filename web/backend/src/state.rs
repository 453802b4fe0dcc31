use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use lineupscout_core::ChannelRanker;

use crate::cache::{KeyValueStore, ResponseCache};
use crate::channel_search::ChannelSearchService;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::http::HttpTransport;
use crate::jobs::JobRunner;
use crate::queue::JobQueue;
use crate::refresher::ArtistMetricsRefresher;
use crate::replacement::ChannelReplacementService;
use crate::repository::ArtistRepository;
use crate::scheduler::RefreshScheduler;
use crate::search::ArtistSearchService;
use crate::spotify::SpotifyClient;
use crate::vevo_detection::VevoDetectionService;
use crate::youtube::YouTubeClient;

/// Every service, wired once at startup and shared by handlers and the job worker.
pub struct AppState {
    pub repository: Arc<dyn ArtistRepository>,
    pub queue: Arc<dyn JobQueue>,
    pub spotify: Arc<SpotifyClient>,
    pub youtube: Arc<YouTubeClient>,
    pub search: Arc<ArtistSearchService>,
    pub scheduler: Arc<RefreshScheduler>,
    pub refresher: Arc<ArtistMetricsRefresher>,
    pub detection: Arc<VevoDetectionService>,
    pub channel_search: Arc<ChannelSearchService>,
    pub replacement: Arc<ChannelReplacementService>,
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn ArtistRepository>,
        queue: Arc<dyn JobQueue>,
    ) -> Result<Self, ApiError> {
        let cache = ResponseCache::new(store.clone());

        let spotify = Arc::new(SpotifyClient::new(
            config.spotify.clone(),
            transport.clone(),
            store.clone(),
            config.retry.clone(),
        )?);
        let youtube = Arc::new(YouTubeClient::new(
            config.youtube.clone(),
            transport,
            store.clone(),
            config.retry.clone(),
        )?);

        let scheduler = Arc::new(RefreshScheduler::new(
            repository.clone(),
            queue.clone(),
            youtube.quota().clone(),
            config.freshness.clone(),
        ));
        let search = Arc::new(ArtistSearchService::new(
            spotify.clone(),
            repository.clone(),
            scheduler.clone(),
            queue.clone(),
            cache.clone(),
            config.freshness.clone(),
            config.spotify.search_cache_ttl,
        ));
        let refresher = Arc::new(ArtistMetricsRefresher::new(
            youtube.clone(),
            repository.clone(),
            config.freshness.clone(),
        ));
        let detection = Arc::new(VevoDetectionService::new(repository.clone(), store, config.vevo.clone()));
        let channel_search = Arc::new(ChannelSearchService::new(youtube.clone(), detection.clone(), cache));
        let replacement = Arc::new(ChannelReplacementService::new(
            repository.clone(),
            youtube.clone(),
            detection.clone(),
            channel_search.clone(),
            ChannelRanker::new(config.ranking.clone()),
        ));
        let jobs = Arc::new(JobRunner::new(
            repository.clone(),
            youtube.clone(),
            search.clone(),
            replacement.clone(),
            queue.clone(),
        ));

        Ok(Self {
            repository,
            queue,
            spotify,
            youtube,
            search,
            scheduler,
            refresher,
            detection,
            channel_search,
            replacement,
            jobs,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/artists/search", get(handlers::search_artists))
        .route("/api/artists/:id/youtube/refresh", post(handlers::refresh_artist_youtube))
        .route("/api/artists/:id/youtube/vevo-check", post(handlers::queue_vevo_check))
        .route("/api/youtube/quota", get(handlers::quota_status))
        .route("/api/youtube/quota/reset", post(handlers::reset_quota))
        .route("/api/youtube/dispatch", post(handlers::dispatch_refresh))
        .with_state(state)
}
