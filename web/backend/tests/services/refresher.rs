use chrono::{TimeDelta, Utc};
use lineupscout_core::MetricsRecord;
use lineupscout_web::http::HttpResponse;
use serde_json::json;

use crate::fixtures::{FakeChannel, FakeTransport, Harness, fresh_metrics, ok_json, serve_channels};

fn serve_channel_with_videos(transport: &FakeTransport, subscribers: u64) {
    serve_channels(
        transport,
        vec![FakeChannel::new("UC1", "Fever Ray", subscribers, 2).with_uploads("UU1")],
    );
    transport.always(
        "/playlistItems",
        ok_json(json!({"items": [
            {"contentDetails": {"videoId": "v1"}},
            {"contentDetails": {"videoId": "v2"}},
        ]})),
    );
    transport.always(
        "/videos",
        ok_json(json!({"items": [
            {"id": "v1", "statistics": {"viewCount": "1000", "likeCount": "50", "commentCount": "4"}},
            {"id": "v2", "statistics": {"viewCount": "3000", "likeCount": "150", "commentCount": "6"}},
        ]})),
    );
}

#[tokio::test]
async fn force_refresh_updates_both_facets() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UC1")).await;
    serve_channel_with_videos(&h.transport, 42_000);

    assert!(h.state.refresher.force_refresh(&artist).await.unwrap());

    let metrics = h.stored_metrics(1).await.unwrap();
    assert_eq!(metrics.youtube_subscribers, Some(42_000));
    assert_eq!(metrics.youtube_avg_views, Some(2000.0));
    assert_eq!(metrics.youtube_avg_likes, Some(100.0));
    assert_eq!(metrics.youtube_videos_analyzed, Some(2));
    assert!(metrics.youtube_refreshed_at.is_some());
    assert!(metrics.youtube_analytics_refreshed_at.is_some());
    assert!(metrics.refreshed_at.is_some());
}

#[tokio::test]
async fn force_refresh_without_channel_does_nothing() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", None).await;

    assert!(!h.state.refresher.force_refresh(&artist).await.unwrap());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn missing_channel_is_not_refreshed() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UCgone")).await;
    serve_channels(&h.transport, vec![]);

    assert!(!h.state.refresher.force_refresh(&artist).await.unwrap());
    assert_eq!(h.stored_metrics(1).await, None);
}

#[tokio::test]
async fn provider_failures_report_false() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UC1")).await;
    h.transport.always("/channels", HttpResponse::new(503, "unavailable"));

    assert!(!h.state.refresher.refresh_basic_metrics(&artist).await.unwrap());
    assert!(!h.state.refresher.refresh_analytics(&artist).await.unwrap());
    assert_eq!(h.stored_metrics(1).await, None);
}

#[tokio::test]
async fn fresh_metrics_are_left_alone() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UC1")).await;
    h.metrics(fresh_metrics(1, 100)).await;

    assert!(!h.state.refresher.refresh_if_needed(&artist).await.unwrap());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn only_stale_analytics_are_refreshed() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UC1")).await;
    let base_stamp = Utc::now() - TimeDelta::hours(1);
    h.metrics(MetricsRecord {
        refreshed_at: Some(base_stamp),
        youtube_analytics_refreshed_at: Some(Utc::now() - TimeDelta::days(10)),
        ..fresh_metrics(1, 100)
    })
    .await;
    serve_channel_with_videos(&h.transport, 42_000);

    assert!(h.state.refresher.refresh_if_needed(&artist).await.unwrap());

    let metrics = h.stored_metrics(1).await.unwrap();
    assert_eq!(metrics.youtube_subscribers, Some(100));
    assert_eq!(metrics.youtube_avg_views, Some(2000.0));
    assert_eq!(metrics.refreshed_at, Some(base_stamp));
}

#[tokio::test]
async fn artist_without_metrics_is_force_refreshed() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", Some("UC1")).await;
    serve_channel_with_videos(&h.transport, 7_000);

    assert!(h.state.refresher.refresh_if_needed(&artist).await.unwrap());
    assert_eq!(h.stored_metrics(1).await.unwrap().youtube_subscribers, Some(7_000));
}

#[tokio::test]
async fn needs_refresh_follows_freshness() {
    let h = Harness::new();
    let without_channel = h.artist(1, "No Channel", None).await;
    let never_fetched = h.artist(2, "Never", Some("UC2")).await;
    let fresh = h.artist(3, "Fresh", Some("UC3")).await;
    let stale = h.artist(4, "Stale", Some("UC4")).await;
    h.metrics(fresh_metrics(3, 10)).await;
    h.metrics(MetricsRecord {
        youtube_refreshed_at: Some(Utc::now() - TimeDelta::days(3)),
        ..fresh_metrics(4, 10)
    })
    .await;

    let refresher = &h.state.refresher;
    assert!(!refresher.needs_refresh(&without_channel).await.unwrap());
    assert!(refresher.needs_refresh(&never_fetched).await.unwrap());
    assert!(!refresher.needs_refresh(&fresh).await.unwrap());
    assert!(refresher.needs_refresh(&stale).await.unwrap());
}
