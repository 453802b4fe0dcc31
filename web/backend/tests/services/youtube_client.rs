use std::sync::Arc;
use std::time::Duration;

use lineupscout_web::cache::MokaStore;
use lineupscout_web::error::ApiError;
use lineupscout_web::http::{HttpResponse, RetryPolicy};
use lineupscout_web::youtube::YouTubeClient;
use serde_json::json;

use crate::fixtures::{
    FakeChannel, FakeTransport, ok_json, quota_exceeded, serve_channel_search, serve_channels, test_config,
};

fn client(transport: &Arc<FakeTransport>, quota_limit: u32) -> YouTubeClient {
    let mut config = test_config().youtube;
    config.quota_limit = quota_limit;
    YouTubeClient::new(
        config,
        transport.clone(),
        Arc::new(MokaStore::default()),
        RetryPolicy::new(3, Duration::ZERO),
    )
    .unwrap()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn metered_calls_stop_once_the_budget_is_spent() {
    let transport = Arc::new(FakeTransport::new());
    serve_channels(
        &transport,
        vec![
            FakeChannel::new("UC1", "One", 5_000, 10),
            FakeChannel::new("UC2", "Two", 5_000, 10),
            FakeChannel::new("UC3", "Three", 5_000, 10),
        ],
    );
    let youtube = client(&transport, 2);

    assert!(youtube.channel_metrics("UC1").await.unwrap().is_some());
    assert_eq!(youtube.quota().remaining().await, 1);

    assert!(youtube.channel_metrics("UC2").await.unwrap().is_some());
    assert_eq!(youtube.quota().remaining().await, 0);
    assert!(!youtube.quota().check_availability(1).await);

    assert_eq!(youtube.channel_metrics("UC3").await.unwrap(), None);
    assert_eq!(transport.count("/channels"), 2);
}

#[tokio::test]
async fn exhausted_quota_returns_only_cached_channels() {
    let transport = Arc::new(FakeTransport::new());
    serve_channels(
        &transport,
        vec![
            FakeChannel::new("UC1", "One", 1_000, 1),
            FakeChannel::new("UC2", "Two", 2_000, 1),
            FakeChannel::new("UC3", "Three", 3_000, 1),
            FakeChannel::new("UC4", "Four", 4_000, 1),
        ],
    );
    let youtube = client(&transport, 10_000);

    youtube.channel_metrics_batch(&ids(&["UC1", "UC2"])).await.unwrap();
    youtube.quota().mark_exhausted().await;

    let batch = youtube
        .channel_metrics_batch(&ids(&["UC1", "UC2", "UC3", "UC4"]))
        .await
        .unwrap();

    assert_eq!(batch.channels.len(), 2);
    assert_eq!(batch.channels["UC2"].subscriber_count, 2_000);
    assert_eq!(batch.unresolved, ids(&["UC3", "UC4"]));
    assert!(!batch.is_complete());
    assert_eq!(transport.count("/channels"), 1);
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let transport = Arc::new(FakeTransport::new());
    transport.enqueue("/channels", HttpResponse::new(500, "backend error"));
    transport.enqueue("/channels", HttpResponse::new(500, "backend error"));
    serve_channels(&transport, vec![FakeChannel::new("UC1", "One", 7_500, 3)]);
    let youtube = client(&transport, 10_000);

    let channel = youtube.channel_metrics("UC1").await.unwrap().unwrap();

    assert_eq!(channel.subscriber_count, 7_500);
    assert_eq!(transport.count("/channels"), 3);
    assert_eq!(youtube.quota().used_today().await, 1);
}

#[tokio::test]
async fn persistent_failures_leave_the_batch_unresolved() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/channels", HttpResponse::new(503, "unavailable"));
    let youtube = client(&transport, 10_000);

    let batch = youtube.channel_metrics_batch(&ids(&["UC1"])).await.unwrap();

    assert!(batch.channels.is_empty());
    assert_eq!(batch.unresolved, ids(&["UC1"]));
    assert_eq!(transport.count("/channels"), 3);
}

#[tokio::test]
async fn quota_rejection_marks_the_ledger_exhausted() {
    let transport = Arc::new(FakeTransport::new());
    transport.enqueue("/channels", quota_exceeded());
    serve_channels(&transport, vec![FakeChannel::new("UC1", "One", 1_000, 1)]);
    let youtube = client(&transport, 10_000);

    let batch = youtube.channel_metrics_batch(&ids(&["UC1"])).await.unwrap();
    assert_eq!(batch.unresolved, ids(&["UC1"]));
    assert!(youtube.quota().is_exhausted().await);

    assert_eq!(youtube.channel_metrics("UC1").await.unwrap(), None);
    assert_eq!(transport.count("/channels"), 1);
}

#[tokio::test]
async fn missing_channels_are_remembered() {
    let transport = Arc::new(FakeTransport::new());
    serve_channels(&transport, vec![FakeChannel::new("UC1", "One", 1_000, 1)]);
    let youtube = client(&transport, 10_000);

    let first = youtube.channel_metrics_batch(&ids(&["UC1", "UCgone"])).await.unwrap();
    assert_eq!(first.not_found, ids(&["UCgone"]));
    assert!(first.is_complete());

    let second = youtube.channel_metrics_batch(&ids(&["UCgone"])).await.unwrap();
    assert_eq!(second.not_found, ids(&["UCgone"]));
    assert_eq!(transport.count("/channels"), 1);
}

#[tokio::test]
async fn batches_over_fifty_ids_are_rejected_before_any_request() {
    let transport = Arc::new(FakeTransport::new());
    let youtube = client(&transport, 10_000);
    let too_many: Vec<String> = (0..51).map(|i| format!("UC{}", i)).collect();

    let result = youtube.channel_metrics_batch(&too_many).await;

    assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
    assert!(transport.requests().is_empty());
    assert_eq!(youtube.quota().used_today().await, 0);
}

#[tokio::test]
async fn search_needs_a_hundred_units() {
    let transport = Arc::new(FakeTransport::new());
    let youtube = client(&transport, 50);

    let result = youtube.search_channels("Fever Ray", 10).await;

    assert_eq!(result, Err(ApiError::QuotaExhausted { cost: 100 }));
    assert_eq!(transport.count("/v3/search"), 0);
}

#[tokio::test]
async fn identical_channel_searches_are_charged_once() {
    let transport = Arc::new(FakeTransport::new());
    serve_channel_search(
        &transport,
        vec![("Fever Ray", vec![FakeChannel::new("UCfr", "Fever Ray", 40_000, 30)])],
    );
    let youtube = client(&transport, 10_000);

    let first = youtube.search_channels("Fever Ray", 5).await.unwrap();
    let second = youtube.search_channels("  fever   RAY ", 5).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].channel_id, "UCfr");
    assert_eq!(second, first);
    assert_eq!(transport.count("/v3/search"), 1);
    assert_eq!(youtube.quota().used_today().await, 100);
}

#[tokio::test]
async fn failed_channel_searches_are_not_cached() {
    let transport = Arc::new(FakeTransport::new());
    transport.enqueue("/v3/search", HttpResponse::new(429, "").with_header("Retry-After", "5"));
    serve_channel_search(
        &transport,
        vec![("Fever Ray", vec![FakeChannel::new("UCfr", "Fever Ray", 40_000, 30)])],
    );
    let youtube = client(&transport, 10_000);

    assert!(youtube.search_channels("Fever Ray", 5).await.is_err());
    assert_eq!(youtube.search_channels("Fever Ray", 5).await.unwrap().len(), 1);
    assert_eq!(transport.count("/v3/search"), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/channels", HttpResponse::new(400, "bad request"));
    let youtube = client(&transport, 10_000);

    let batch = youtube.channel_metrics_batch(&ids(&["UC1"])).await.unwrap();

    assert_eq!(batch.unresolved, ids(&["UC1"]));
    assert_eq!(transport.count("/channels"), 1);
    assert!(!youtube.quota().is_exhausted().await);
}

#[tokio::test]
async fn rate_limited_search_reports_retry_after() {
    let transport = Arc::new(FakeTransport::new());
    transport.enqueue("/v3/search", HttpResponse::new(429, "").with_header("Retry-After", "30"));
    let youtube = client(&transport, 10_000);

    let result = youtube.search_channels("Fever Ray", 10).await;

    assert_eq!(
        result,
        Err(ApiError::RateLimited {
            retry_after: Duration::from_secs(30)
        })
    );
}

#[tokio::test]
async fn video_analytics_average_recent_uploads_and_are_cached() {
    let transport = Arc::new(FakeTransport::new());
    serve_channels(&transport, vec![FakeChannel::new("UC1", "One", 1_000, 2).with_uploads("UU1")]);
    transport.enqueue(
        "/playlistItems",
        ok_json(json!({"items": [
            {"contentDetails": {"videoId": "v1"}},
            {"contentDetails": {"videoId": "v2"}},
        ]})),
    );
    transport.enqueue(
        "/videos",
        ok_json(json!({"items": [
            {"id": "v1", "statistics": {"viewCount": "100", "likeCount": "10", "commentCount": "2"}},
            {"id": "v2", "statistics": {"viewCount": "300", "likeCount": "30"}},
        ]})),
    );
    let youtube = client(&transport, 10_000);

    let analytics = youtube.video_analytics("UC1").await.unwrap().unwrap();

    assert_eq!(analytics.videos_analyzed, 2);
    assert!((analytics.average_views - 200.0).abs() < f64::EPSILON);
    assert!((analytics.average_likes - 20.0).abs() < f64::EPSILON);
    assert!((analytics.average_comments - 1.0).abs() < f64::EPSILON);

    let playlist_request = &transport.requests_to("/playlistItems")[0];
    assert_eq!(playlist_request.query_value("playlistId"), Some("UU1"));
    assert_eq!(playlist_request.query_value("maxResults"), Some("15"));
    assert_eq!(playlist_request.query_value("key"), Some("yt-key"));

    let again = youtube.video_analytics("UC1").await.unwrap().unwrap();
    assert_eq!(again, analytics);
    assert_eq!(transport.count("/videos"), 1);
}

#[tokio::test]
async fn channels_without_uploads_have_no_analytics() {
    let transport = Arc::new(FakeTransport::new());
    serve_channels(&transport, vec![FakeChannel::new("UC1", "One", 1_000, 0)]);
    let youtube = client(&transport, 10_000);

    assert_eq!(youtube.video_analytics("UC1").await.unwrap(), None);
    assert_eq!(transport.count("/playlistItems"), 0);
}
