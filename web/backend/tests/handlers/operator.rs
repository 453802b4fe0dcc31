use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lineupscout_web::handlers::{
    dispatch_refresh, queue_vevo_check, quota_status, refresh_artist_youtube, reset_quota,
};
use lineupscout_web::models::{DispatchRequest, RefreshQuery};
use lineupscout_web::queue::Job;

use crate::fixtures::{FakeChannel, Harness, serve_channels};

#[tokio::test]
async fn refresh_of_unknown_artist_is_not_found() {
    let h = Harness::new();

    let err = refresh_artist_youtube(State(h.state.clone()), Path(42), Query(RefreshQuery::default()))
        .await
        .err()
        .unwrap();

    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forced_refresh_returns_stored_metrics() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    serve_channels(&h.transport, vec![FakeChannel::new("UC1", "Fever Ray", 12_345, 0)]);

    let data = refresh_artist_youtube(State(h.state.clone()), Path(1), Query(RefreshQuery { force: true }))
        .await
        .unwrap()
        .0;

    assert_eq!(data.artist_id, 1);
    assert!(data.refreshed);
    assert_eq!(data.metrics.unwrap().youtube_subscribers, Some(12_345));
}

#[tokio::test]
async fn vevo_check_is_queued() {
    let h = Harness::new();
    h.artist(7, "Fever Ray", Some("UC1")).await;

    let (status, body) = queue_vevo_check(State(h.state.clone()), Path(7)).await.unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body.0.operation, "replace_vevo_channel");
    assert_eq!(h.queue.jobs().await[0].job, Job::ReplaceVevoChannel { artist_id: 7 });
}

#[tokio::test]
async fn vevo_check_for_unknown_artist_is_not_found() {
    let h = Harness::new();

    let err = queue_vevo_check(State(h.state.clone()), Path(7)).await.err().unwrap();

    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    assert!(h.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn quota_can_be_inspected_and_reset() {
    let h = Harness::new();
    h.state.youtube.quota().track(500).await;
    h.state.youtube.quota().mark_exhausted().await;

    let status = quota_status(State(h.state.clone())).await.0;
    assert_eq!(status.used, 500);
    assert_eq!(status.limit, 10_000);
    assert!(status.is_exhausted);

    let after_reset = reset_quota(State(h.state.clone())).await.0;
    assert_eq!(after_reset.used, 0);
    assert!(!after_reset.is_exhausted);
}

#[tokio::test]
async fn dispatch_reports_job_counts() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    h.artist(2, "The Knife", Some("UC2")).await;

    let stats = dispatch_refresh(
        State(h.state.clone()),
        Json(DispatchRequest {
            artist_ids: vec![1, 2],
            respect_quota: true,
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(stats.high_priority, 1);
    assert_eq!(stats.total_jobs, 1);
    assert_eq!(stats.total_artists, 2);
}
