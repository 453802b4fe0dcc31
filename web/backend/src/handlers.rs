use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lineupscout_core::ArtistId;

use crate::error::{ApiError, ServiceError};
use crate::models::{
    DispatchRequest, ErrorResponse, HealthResponse, QueuedResponse, RefreshQuery, RefreshResponse, SearchQuery,
    SearchResponse,
};
use crate::queue::Job;
use crate::quota::QuotaStatus;
use crate::repository::RepoError;
use crate::scheduler::DispatchStats;
use crate::state::AppState;

/// Error body plus status for failed operator requests.
#[derive(Debug)]
pub struct HandlerError(StatusCode, String);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::ArtistNotFound(_) | ServiceError::Repository(RepoError::ArtistNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidArgument(_) | ServiceError::Api(ApiError::InvalidArgument(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Api(ApiError::QuotaExhausted { .. } | ApiError::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ServiceError::Api(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Repository(_) | ServiceError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }
        HandlerError(status, err.to_string())
    }
}

impl From<RepoError> for HandlerError {
    fn from(err: RepoError) -> Self {
        ServiceError::from(err).into()
    }
}

type HandlerResult<T> = Result<Json<T>, HandlerError>;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Lineupscout API is running".to_string(),
    })
}

pub async fn search_artists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> HandlerResult<SearchResponse> {
    let query = params.q.trim().to_string();
    let results = state.search.search(&query, params.limit).await?;
    let count = results.len();

    Ok(Json(SearchResponse { query, results, count }))
}

pub async fn refresh_artist_youtube(
    State(state): State<Arc<AppState>>,
    Path(artist_id): Path<ArtistId>,
    Query(params): Query<RefreshQuery>,
) -> HandlerResult<RefreshResponse> {
    let artist = state
        .repository
        .find_artist(artist_id)
        .await?
        .ok_or_else(|| ServiceError::ArtistNotFound(artist_id.to_string()))?;

    let refreshed = if params.force {
        state.refresher.force_refresh(&artist).await?
    } else {
        state.refresher.refresh_if_needed(&artist).await?
    };
    let metrics = state.repository.get_metrics(artist_id).await?;

    Ok(Json(RefreshResponse {
        artist_id,
        refreshed,
        metrics,
    }))
}

/// Queues a VEVO check (and replacement when needed) for one artist.
pub async fn queue_vevo_check(
    State(state): State<Arc<AppState>>,
    Path(artist_id): Path<ArtistId>,
) -> Result<(StatusCode, Json<QueuedResponse>), HandlerError> {
    if state.repository.find_artist(artist_id).await?.is_none() {
        return Err(ServiceError::ArtistNotFound(artist_id.to_string()).into());
    }

    let job = Job::ReplaceVevoChannel { artist_id };
    let operation = job.name();
    state.queue.enqueue(job, None).await.map_err(ServiceError::from)?;

    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { operation, artist_id })))
}

pub async fn quota_status(State(state): State<Arc<AppState>>) -> Json<QuotaStatus> {
    Json(state.youtube.quota().status().await)
}

pub async fn reset_quota(State(state): State<Arc<AppState>>) -> Json<QuotaStatus> {
    let quota = state.youtube.quota();
    quota.reset().await;
    tracing::info!("YouTube quota reset by operator");
    Json(quota.status().await)
}

pub async fn dispatch_refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> HandlerResult<DispatchStats> {
    let stats = state
        .scheduler
        .dispatch_priority_jobs(&request.artist_ids, request.respect_quota)
        .await?;
    Ok(Json(stats))
}
