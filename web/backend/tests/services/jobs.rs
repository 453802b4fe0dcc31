use lineupscout_core::{ArtistExternalProfile, ArtistRecord};
use lineupscout_web::http::HttpResponse;
use lineupscout_web::jobs::{FetchReport, JobOutcome, QUOTA_RETRY_DELAY};
use lineupscout_web::queue::{Job, QueuedJob};
use lineupscout_web::replacement::ReplacementOutcome;

use crate::fixtures::{FakeChannel, Harness, fresh_metrics, serve_channels, test_config};

fn fetch(artist_ids: Vec<i64>, batch_size_hint: usize) -> Job {
    Job::FetchYoutubeData {
        artist_ids,
        batch_size_hint,
    }
}

fn profile(spotify_id: &str, name: &str) -> ArtistExternalProfile {
    ArtistExternalProfile {
        spotify_id: spotify_id.to_string(),
        name: name.to_string(),
        genres: vec!["pop".to_string()],
        image_url: None,
        popularity: 40,
        followers: 12_000,
    }
}

#[tokio::test]
async fn artists_sharing_a_channel_are_fetched_together() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    h.artist(2, "Karin Dreijer", Some("UC1")).await;
    h.artist(3, "The Knife", Some("UC2")).await;
    h.artist(4, "Gone", Some("UCgone")).await;
    h.artist(5, "No Channel", None).await;
    let existing = fresh_metrics(3, 1);
    h.metrics(existing.clone()).await;
    serve_channels(
        &h.transport,
        vec![
            FakeChannel::new("UC1", "Fever Ray", 10_000, 20),
            FakeChannel::new("UC2", "The Knife", 20_000, 30),
        ],
    );

    let outcome = h.state.jobs.run(fetch(vec![1, 2, 3, 4, 5], 20)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Fetched(FetchReport {
            processed: 4,
            ..FetchReport::default()
        })
    );
    assert_eq!(h.transport.count("/channels"), 1);

    for id in [1, 2] {
        let metrics = h.stored_metrics(id).await.unwrap();
        assert_eq!(metrics.youtube_subscribers, Some(10_000));
        assert!(metrics.refreshed_at.is_some());
    }

    let knife = h.stored_metrics(3).await.unwrap();
    assert_eq!(knife.youtube_subscribers, Some(20_000));
    assert_eq!(knife.refreshed_at, existing.refreshed_at);

    let gone = h.stored_metrics(4).await.unwrap();
    assert_eq!(gone.youtube_subscribers, None);
    assert!(gone.youtube_refreshed_at.is_some());

    assert_eq!(h.stored_metrics(5).await, None);
}

#[tokio::test]
async fn missing_channel_clears_old_subscribers() {
    let h = Harness::new();
    h.artist(1, "Gone", Some("UCgone")).await;
    h.metrics(fresh_metrics(1, 5_000)).await;
    serve_channels(&h.transport, vec![]);

    h.state.jobs.run(fetch(vec![1], 20)).await.unwrap();

    assert_eq!(h.stored_metrics(1).await.unwrap().youtube_subscribers, None);
}

#[tokio::test]
async fn unreachable_channels_are_skipped() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    h.artist(2, "The Knife", Some("UC2")).await;
    h.transport.always("/channels", HttpResponse::new(503, "unavailable"));

    let outcome = h.state.jobs.run(fetch(vec![1, 2], 20)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Fetched(FetchReport {
            skipped: 2,
            ..FetchReport::default()
        })
    );
    assert_eq!(h.stored_metrics(1).await, None);
}

#[tokio::test]
async fn fetch_is_skipped_without_quota() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    h.state.youtube.quota().mark_exhausted().await;

    let outcome = h.state.jobs.run(fetch(vec![1], 20)).await.unwrap();

    assert_eq!(outcome, JobOutcome::QuotaUnavailable);
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn fetch_stops_when_the_quota_runs_out() {
    let mut config = test_config();
    config.youtube.quota_limit = 1;
    let h = Harness::with_config(config);
    h.artist(1, "Fever Ray", Some("UC1")).await;
    h.artist(2, "The Knife", Some("UC2")).await;
    serve_channels(
        &h.transport,
        vec![
            FakeChannel::new("UC1", "Fever Ray", 10_000, 20),
            FakeChannel::new("UC2", "The Knife", 20_000, 30),
        ],
    );

    let outcome = h.state.jobs.run(fetch(vec![1, 2], 1)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Fetched(FetchReport {
            processed: 1,
            stopped_by_quota: true,
            ..FetchReport::default()
        })
    );
    assert_eq!(h.transport.count("/channels"), 1);
    assert_eq!(h.stored_metrics(2).await, None);
}

#[tokio::test]
async fn spotify_creation_skips_known_artists() {
    let h = Harness::new();
    let mut known = ArtistRecord::new(1, "Fever Ray");
    known.spotify_id = Some("sp1".to_string());
    h.repository.insert_artist(known).await;

    let job = Job::CreateArtistsFromSpotify {
        artists: vec![profile("sp1", "Fever Ray"), profile("sp2", "Robyn")],
    };
    let outcome = h.state.jobs.run(job.clone()).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Created {
            created: 1,
            already_existed: 1
        }
    );

    let again = h.state.jobs.run(job).await.unwrap();
    assert_eq!(
        again,
        JobOutcome::Created {
            created: 0,
            already_existed: 2
        }
    );
    assert_eq!(h.repository.artist_count().await, 2);
}

#[tokio::test]
async fn replacement_result_is_reported() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;
    serve_channels(&h.transport, vec![FakeChannel::new("UC1", "Fever Ray", 20_000, 40)]);

    let outcome = h
        .state
        .jobs
        .run(Job::ReplaceVevoChannel { artist_id: 1 })
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Replacement(ReplacementOutcome::NotVevo));
}

#[tokio::test]
async fn throttled_replacement_is_requeued() {
    let mut config = test_config();
    config.youtube.quota_limit = 50;
    let h = Harness::with_config(config);
    h.artist(1, "Fever Ray", None).await;

    let outcome = h
        .state
        .jobs
        .run(Job::ReplaceVevoChannel { artist_id: 1 })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Requeued {
            delay: QUOTA_RETRY_DELAY
        }
    );
    assert_eq!(
        h.queue.jobs().await,
        vec![QueuedJob {
            job: Job::ReplaceVevoChannel { artist_id: 1 },
            delay: Some(QUOTA_RETRY_DELAY),
        }]
    );
}

#[tokio::test]
async fn replacement_is_requeued_when_the_current_channel_cannot_be_fetched() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UCvevo")).await;
    h.state.youtube.quota().mark_exhausted().await;

    let outcome = h
        .state
        .jobs
        .run(Job::ReplaceVevoChannel { artist_id: 1 })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Requeued {
            delay: QUOTA_RETRY_DELAY
        }
    );
    assert_eq!(h.queue.jobs().await.len(), 1);
}

#[tokio::test]
async fn replacement_for_unknown_artist_is_dropped() {
    let h = Harness::new();

    let outcome = h
        .state
        .jobs
        .run(Job::ReplaceVevoChannel { artist_id: 99 })
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::ArtistMissing(99));
    assert!(h.queue.jobs().await.is_empty());
}
