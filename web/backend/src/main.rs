use std::path::Path;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lineupscout_web::cache::MokaStore;
use lineupscout_web::config::AppConfig;
use lineupscout_web::http::ReqwestTransport;
use lineupscout_web::jobs::spawn_worker;
use lineupscout_web::queue::ChannelQueue;
use lineupscout_web::repository::{ArtistSeed, InMemoryRepository};
use lineupscout_web::{AppState, router};

type StartupError = Box<dyn std::error::Error>;

async fn load_repository(config: &AppConfig) -> Result<InMemoryRepository, StartupError> {
    let repository = match &config.snapshot_path {
        Some(path) => InMemoryRepository::with_snapshot(path.clone()),
        None => InMemoryRepository::new(),
    };
    repository.load_snapshot().await?;

    if let Some(seed_path) = &config.seed_path {
        let created = seed_repository(&repository, seed_path).await?;
        tracing::info!(path = %seed_path.display(), created, "Seeded artists");
    }

    repository.start_periodic_snapshots();
    Ok(repository)
}

async fn seed_repository(repository: &InMemoryRepository, path: &Path) -> Result<usize, StartupError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let seeds: Vec<ArtistSeed> = serde_json::from_str(&contents)?;
    Ok(repository.seed(seeds).await?)
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let repository = Arc::new(load_repository(&config).await?);
    tracing::info!(artists = repository.artist_count().await, "Repository ready");

    let transport = Arc::new(ReqwestTransport::new(config.http_timeout)?);
    let (queue, receiver) = ChannelQueue::new();
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState::new(
        config,
        transport,
        Arc::new(MokaStore::default()),
        repository,
        Arc::new(queue),
    )?);
    spawn_worker(state.jobs.clone(), receiver);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "Server running");

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lineupscout_web=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Failed to start server");
        std::process::exit(1);
    }
}
