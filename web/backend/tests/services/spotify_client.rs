use std::sync::Arc;
use std::time::Duration;

use lineupscout_web::cache::MokaStore;
use lineupscout_web::config::SpotifyConfig;
use lineupscout_web::error::ApiError;
use lineupscout_web::http::{HttpResponse, Method, RetryPolicy};
use lineupscout_web::spotify::SpotifyClient;
use serde_json::json;

use crate::fixtures::{
    FakeTransport, ok_json, spotify_artist_json, spotify_search_json, test_config, token_response,
};

fn client_with(transport: &Arc<FakeTransport>, config: SpotifyConfig) -> SpotifyClient {
    SpotifyClient::new(
        config,
        transport.clone(),
        Arc::new(MokaStore::default()),
        RetryPolicy::new(3, Duration::ZERO),
    )
    .unwrap()
}

fn client(transport: &Arc<FakeTransport>) -> SpotifyClient {
    client_with(transport, test_config().spotify)
}

#[tokio::test]
async fn identical_searches_hit_the_network_once() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue(
        "/v1/search",
        ok_json(spotify_search_json(vec![spotify_artist_json("sp1", "Fever Ray", 55, 400_000)])),
    );
    let spotify = client(&transport);

    let first = spotify.search_artists("Fever Ray", 10).await.unwrap();
    let second = spotify.search_artists("  fever   ray ", 10).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].spotify_id, "sp1");
    assert_eq!(first[0].followers, 400_000);
    assert_eq!(first[0].image_url.as_deref(), Some("https://img.test/sp1.jpg"));
    assert_eq!(transport.count("/v1/search"), 1);
    assert_eq!(transport.count("/api/token"), 1);
}

#[tokio::test]
async fn token_request_uses_client_credentials() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue("/v1/search", ok_json(spotify_search_json(vec![])));
    let spotify = client(&transport);

    spotify.search_artists("anyone", 5).await.unwrap();

    let token_request = &transport.requests_to("/api/token")[0];
    assert_eq!(token_request.method, Method::Post);
    assert!(
        token_request
            .form
            .contains(&("grant_type".to_string(), "client_credentials".to_string()))
    );

    let search_request = &transport.requests_to("/v1/search")[0];
    assert_eq!(search_request.bearer_token.as_deref(), Some("token-1"));
    assert_eq!(search_request.query_value("type"), Some("artist"));
    assert_eq!(search_request.query_value("limit"), Some("5"));
}

#[tokio::test]
async fn rejected_token_is_refreshed_once() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue("/v1/artists/sp1", HttpResponse::new(401, "expired"));
    transport.enqueue("/v1/artists/sp1", ok_json(spotify_artist_json("sp1", "Fever Ray", 55, 10)));
    let spotify = client(&transport);

    let artist = spotify.artist("sp1").await.unwrap().unwrap();

    assert_eq!(artist.name, "Fever Ray");
    assert_eq!(transport.count("/api/token"), 2);
    assert_eq!(transport.count("/v1/artists/sp1"), 2);
}

#[tokio::test]
async fn second_rejection_is_unauthorized() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.always("/v1/artists/sp1", HttpResponse::new(401, "nope"));
    let spotify = client(&transport);

    assert_eq!(spotify.artist("sp1").await, Err(ApiError::Unauthorized));
    assert_eq!(transport.count("/v1/artists/sp1"), 2);
}

#[tokio::test]
async fn throttled_response_carries_retry_after() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue("/v1/search", HttpResponse::new(429, "").with_header("Retry-After", "7"));
    let spotify = client(&transport);

    let result = spotify.search_artists("Fever Ray", 10).await;

    assert_eq!(
        result,
        Err(ApiError::RateLimited {
            retry_after: Duration::from_secs(7)
        })
    );
}

#[tokio::test]
async fn local_rate_limit_blocks_before_sending() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.always("/v1/search", ok_json(spotify_search_json(vec![])));
    let mut config = test_config().spotify;
    config.rate_limit_per_minute = 1;
    let spotify = client_with(&transport, config);

    spotify.search_artists("first", 10).await.unwrap();
    let second = spotify.search_artists("second", 10).await;

    assert!(matches!(second, Err(ApiError::RateLimited { .. })));
    assert_eq!(transport.count("/v1/search"), 1);
}

#[tokio::test]
async fn unknown_artist_is_none_and_remembered() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue("/v1/artists/missing", HttpResponse::new(404, "{}"));
    let spotify = client(&transport);

    assert_eq!(spotify.artist("missing").await, Ok(None));
    assert_eq!(spotify.artist("missing").await, Ok(None));
    assert_eq!(transport.count("/v1/artists/missing"), 1);
}

#[tokio::test]
async fn top_tracks_are_capped_at_the_limit() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    let tracks: Vec<_> = (0..5)
        .map(|i| {
            json!({
                "id": format!("t{}", i),
                "name": format!("Track {}", i),
                "album": {"name": "Plunge", "images": []},
                "duration_ms": 200_000,
                "artists": [{"name": "Fever Ray"}],
            })
        })
        .collect();
    transport.enqueue("/v1/artists/sp1/top-tracks", ok_json(json!({"tracks": tracks})));
    let spotify = client(&transport);

    let top = spotify.top_tracks("sp1", "US", 3).await.unwrap();

    assert_eq!(top.len(), 3);
    assert_eq!(top[0].album_name, "Plunge");
    assert_eq!(top[0].artists, vec!["Fever Ray"]);
    assert_eq!(
        transport.requests_to("/v1/artists/sp1/top-tracks")[0].query_value("market"),
        Some("US")
    );
}

#[tokio::test]
async fn albums_request_groups_and_limit() {
    let transport = Arc::new(FakeTransport::new());
    transport.always("/api/token", token_response());
    transport.enqueue(
        "/v1/artists/sp1/albums",
        ok_json(json!({"items": [
            {"id": "a1", "name": "Plunge", "album_type": "album", "release_date": "2017-10-27", "total_tracks": 11}
        ]})),
    );
    let spotify = client(&transport);

    let albums = spotify.albums("sp1", 50, "album,single").await.unwrap();

    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].total_tracks, 11);
    let request = &transport.requests_to("/v1/artists/sp1/albums")[0];
    assert_eq!(request.query_value("limit"), Some("20"));
    assert_eq!(request.query_value("include_groups"), Some("album,single"));
}

#[test]
fn missing_credentials_fail_construction() {
    let transport = Arc::new(FakeTransport::new());
    let result = SpotifyClient::new(
        SpotifyConfig::new("", "secret"),
        transport,
        Arc::new(MokaStore::default()),
        RetryPolicy::default(),
    );

    assert!(matches!(result, Err(ApiError::Config(_))));
}
