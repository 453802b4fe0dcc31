use lineupscout_core::ArtistRecord;
use lineupscout_web::error::ServiceError;
use lineupscout_web::http::HttpResponse;
use lineupscout_web::models::ResultSource;
use lineupscout_web::queue::Job;

use crate::fixtures::{
    Harness, fresh_metrics, ok_json, spotify_artist_json, spotify_search_json, token_response,
};

async fn stored_with_spotify(h: &Harness, id: i64, name: &str, spotify_id: &str, channel: Option<&str>) -> ArtistRecord {
    let mut artist = ArtistRecord::new(id, name);
    artist.spotify_id = Some(spotify_id.to_string());
    artist.youtube_channel_id = channel.map(str::to_string);
    h.repository.insert_artist(artist.clone()).await;
    artist
}

#[tokio::test]
async fn local_results_come_first_and_unknown_artists_are_queued() {
    let h = Harness::new();
    stored_with_spotify(&h, 1, "Fever Ray", "sp1", Some("UC1")).await;
    h.metrics(fresh_metrics(1, 5_000)).await;
    h.transport.always("/api/token", token_response());
    h.transport.always(
        "/v1/search",
        ok_json(spotify_search_json(vec![
            spotify_artist_json("sp1", "Fever Ray", 55, 400_000),
            spotify_artist_json("sp2", "Fever Ray Tribute", 10, 900),
            spotify_artist_json("sp3", "The Knife", 60, 700_000),
        ])),
    );

    let results = h.state.search.search("fever", 10).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.spotify_id.as_str()).collect();
    assert_eq!(ids, vec!["sp1", "sp2"]);
    assert_eq!(results[0].source, ResultSource::Local);
    assert_eq!(results[0].database_id, Some(1));
    assert!(results[0].score.is_some());
    assert_eq!(results[1].source, ResultSource::Spotify);
    assert!(!results[1].exists_in_database);

    let jobs = h.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    match &jobs[0].job {
        Job::CreateArtistsFromSpotify { artists } => {
            assert_eq!(artists.len(), 1);
            assert_eq!(artists[0].spotify_id, "sp2");
        }
        other => panic!("unexpected job {:?}", other),
    }
}

#[tokio::test]
async fn deleted_artists_stay_hidden() {
    let h = Harness::new();
    stored_with_spotify(&h, 1, "Fever Ray", "sp1", None).await;
    let mut deleted = ArtistRecord::new(2, "Fever Ray Tribute");
    deleted.spotify_id = Some("sp2".to_string());
    deleted.deleted = true;
    h.repository.insert_artist(deleted).await;
    h.transport.always("/api/token", token_response());
    h.transport.always(
        "/v1/search",
        ok_json(spotify_search_json(vec![spotify_artist_json("sp2", "Fever Ray Tribute", 10, 900)])),
    );

    let results = h.state.search.search("fever ray", 10).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].spotify_id, "sp1");
    assert!(h.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn spotify_failure_falls_back_to_local_results() {
    let h = Harness::new();
    stored_with_spotify(&h, 1, "Fever Ray", "sp1", None).await;
    h.transport.always("/api/token", token_response());
    h.transport.always("/v1/search", HttpResponse::new(400, "bad request"));

    let results = h.state.search.search("Fever Ray", 10).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, ResultSource::Local);
}

#[tokio::test]
async fn stale_youtube_data_is_dispatched_for_refresh() {
    let h = Harness::new();
    stored_with_spotify(&h, 1, "Fever Ray", "sp1", Some("UC1")).await;
    h.transport.always("/api/token", token_response());
    h.transport.always("/v1/search", ok_json(spotify_search_json(vec![])));

    h.state.search.search("Fever Ray", 10).await.unwrap();

    let jobs = h.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].job,
        Job::FetchYoutubeData {
            artist_ids: vec![1],
            batch_size_hint: 20,
        }
    );
}

#[tokio::test]
async fn blank_query_returns_nothing() {
    let h = Harness::new();

    assert!(h.state.search.search("   ", 10).await.unwrap().is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn unknown_spotify_artist_is_created_once() {
    let h = Harness::new();
    h.transport.always("/api/token", token_response());
    h.transport.enqueue("/v1/artists/sp9", ok_json(spotify_artist_json("sp9", "Robyn", 70, 2_000_000)));

    let created = h.state.search.get_or_create_from_spotify("sp9").await.unwrap();
    let again = h.state.search.get_or_create_from_spotify("sp9").await.unwrap();

    assert_eq!(created.id, again.id);
    assert_eq!(created.spotify_id.as_deref(), Some("sp9"));
    let metrics = h.stored_metrics(created.id).await.unwrap();
    assert_eq!(metrics.spotify_popularity, Some(70));
    assert_eq!(metrics.spotify_followers, Some(2_000_000));
    assert_eq!(h.transport.count("/v1/artists/sp9"), 1);
}

#[tokio::test]
async fn missing_spotify_artist_is_not_found() {
    let h = Harness::new();
    h.transport.always("/api/token", token_response());
    h.transport.always("/v1/artists/nope", HttpResponse::new(404, "{}"));

    let result = h.state.search.get_or_create_from_spotify("nope").await;

    assert!(matches!(result, Err(ServiceError::ArtistNotFound(id)) if id == "nope"));
}

#[tokio::test]
async fn spotify_id_is_resolved_by_exact_name() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", None).await;
    h.transport.always("/api/token", token_response());
    h.transport.always(
        "/v1/search",
        ok_json(spotify_search_json(vec![
            spotify_artist_json("sp0", "Fever Ray Tribute", 5, 100),
            spotify_artist_json("sp1", "fever ray", 55, 400_000),
        ])),
    );

    let resolved = h.state.search.resolve_spotify_id(&artist).await.unwrap();

    assert_eq!(resolved.as_deref(), Some("sp1"));
    assert_eq!(h.stored_artist(1).await.spotify_id.as_deref(), Some("sp1"));
}

#[tokio::test]
async fn unresolved_names_are_remembered() {
    let h = Harness::new();
    let artist = h.artist(1, "Fever Ray", None).await;
    h.transport.always("/api/token", token_response());
    h.transport.always(
        "/v1/search",
        ok_json(spotify_search_json(vec![spotify_artist_json("sp0", "Fever Ray Tribute", 5, 100)])),
    );

    assert_eq!(h.state.search.resolve_spotify_id(&artist).await.unwrap(), None);
    h.state.spotify.clear_search_cache("Fever Ray", 5).await;
    assert_eq!(h.state.search.resolve_spotify_id(&artist).await.unwrap(), None);
    assert_eq!(h.transport.count("/v1/search"), 1);
}
