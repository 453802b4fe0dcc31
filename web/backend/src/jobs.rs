use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lineupscout_core::{ArtistExternalProfile, ArtistId, ArtistRecord, MetricsUpdate};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::ServiceError;
use crate::queue::{Job, JobQueue, QueuedJob};
use crate::replacement::{ChannelReplacementService, ReplacementOutcome};
use crate::repository::ArtistRepository;
use crate::search::ArtistSearchService;
use crate::youtube::{LIST_COST, MAX_BATCH_SIZE, YouTubeClient};

/// Delay before a replacement blocked by the quota is tried again.
pub const QUOTA_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub processed: usize,
    /// Artists whose channel could not be fetched this run.
    pub skipped: usize,
    pub errors: usize,
    pub stopped_by_quota: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Fetched(FetchReport),
    QuotaUnavailable,
    Created { created: usize, already_existed: usize },
    Replacement(ReplacementOutcome),
    Requeued { delay: Duration },
    ArtistMissing(ArtistId),
}

/// Runs queued jobs against the services.
pub struct JobRunner {
    repository: Arc<dyn ArtistRepository>,
    youtube: Arc<YouTubeClient>,
    search: Arc<ArtistSearchService>,
    replacement: Arc<ChannelReplacementService>,
    queue: Arc<dyn JobQueue>,
}

impl JobRunner {
    pub fn new(
        repository: Arc<dyn ArtistRepository>,
        youtube: Arc<YouTubeClient>,
        search: Arc<ArtistSearchService>,
        replacement: Arc<ChannelReplacementService>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            repository,
            youtube,
            search,
            replacement,
            queue,
        }
    }

    pub async fn run(&self, job: Job) -> Result<JobOutcome, ServiceError> {
        match job {
            Job::FetchYoutubeData {
                artist_ids,
                batch_size_hint,
            } => self.fetch_youtube_data(&artist_ids, batch_size_hint).await,
            Job::CreateArtistsFromSpotify { artists } => self.create_artists_from_spotify(artists).await,
            Job::ReplaceVevoChannel { artist_id } => self.replace_vevo_channel(artist_id).await,
        }
    }

    /// Refreshes subscriber counts, one statistics call per batch of distinct channels.
    async fn fetch_youtube_data(&self, artist_ids: &[ArtistId], batch_size: usize) -> Result<JobOutcome, ServiceError> {
        let quota = self.youtube.quota();
        if !quota.check_availability(LIST_COST).await {
            tracing::warn!(artist_count = artist_ids.len(), "YouTube quota exhausted, skipping fetch job");
            return Ok(JobOutcome::QuotaUnavailable);
        }

        // Artists sharing a channel are refreshed from one lookup
        let mut channel_order: Vec<String> = Vec::new();
        let mut by_channel: FxHashMap<String, Vec<ArtistRecord>> = FxHashMap::default();
        for artist in self.repository.find_artists(artist_ids).await? {
            let Some(channel_id) = artist.youtube_channel().map(str::to_string) else {
                continue;
            };
            if !by_channel.contains_key(&channel_id) {
                channel_order.push(channel_id.clone());
            }
            by_channel.entry(channel_id).or_default().push(artist);
        }

        let mut report = FetchReport::default();
        if channel_order.is_empty() {
            tracing::info!(artist_count = artist_ids.len(), "No artists with YouTube channel ids to fetch");
            return Ok(JobOutcome::Fetched(report));
        }

        let batches: Vec<&[String]> = channel_order.chunks(batch_size.clamp(1, MAX_BATCH_SIZE)).collect();
        let total_batches = batches.len();

        for (index, channel_batch) in batches.into_iter().enumerate() {
            let batch = match self.youtube.channel_metrics_batch(channel_batch).await {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(batch_index = index + 1, error = %err, "YouTube fetch batch failed");
                    report.errors += channel_batch
                        .iter()
                        .map(|channel_id| by_channel.get(channel_id).map_or(0, Vec::len))
                        .sum::<usize>();
                    continue;
                }
            };

            let now = Utc::now();
            for channel_id in channel_batch {
                let artists = by_channel.get(channel_id).map(Vec::as_slice).unwrap_or_default();
                let subscribers = match batch.channels.get(channel_id) {
                    Some(channel) => Some(channel.subscriber_count),
                    None if batch.not_found.contains(channel_id) => {
                        tracing::info!(channel_id = %channel_id, "Channel not found or private");
                        None
                    }
                    None => {
                        report.skipped += artists.len();
                        continue;
                    }
                };

                for artist in artists {
                    let has_record = self.repository.get_metrics(artist.id).await?.is_some();
                    let update = MetricsUpdate {
                        youtube_subscribers: Some(subscribers),
                        youtube_refreshed_at: Some(now),
                        refreshed_at: (!has_record).then_some(now),
                        ..MetricsUpdate::default()
                    };
                    match self.repository.update_metrics(artist.id, update).await {
                        Ok(_) => report.processed += 1,
                        Err(err) => {
                            tracing::error!(artist_id = artist.id, error = %err, "Failed to update artist metrics");
                            report.errors += 1;
                        }
                    }
                }
            }

            if !quota.check_availability(LIST_COST).await {
                tracing::warn!(
                    processed_batches = index + 1,
                    total_batches,
                    processed = report.processed,
                    "Quota exhausted during fetch job"
                );
                report.stopped_by_quota = true;
                break;
            }
        }

        let remaining_quota = quota.remaining().await;
        tracing::info!(
            total_artists = artist_ids.len(),
            processed = report.processed,
            skipped = report.skipped,
            errors = report.errors,
            remaining_quota = remaining_quota,
            "YouTube fetch job completed"
        );
        Ok(JobOutcome::Fetched(report))
    }

    /// Creates artists for Spotify profiles not stored yet, keyed by Spotify id.
    async fn create_artists_from_spotify(
        &self,
        artists: Vec<ArtistExternalProfile>,
    ) -> Result<JobOutcome, ServiceError> {
        let mut created = 0;
        let mut already_existed = 0;

        for profile in artists {
            let existing = self
                .repository
                .find_artists_by_external_ids(std::slice::from_ref(&profile.spotify_id))
                .await?;
            if !existing.is_empty() {
                already_existed += 1;
                continue;
            }

            let spotify_id = profile.spotify_id.clone();
            match self.search.create_from_profile(profile).await {
                Ok(artist) => {
                    tracing::debug!(artist_id = artist.id, spotify_id = %spotify_id, "Created artist from Spotify");
                    created += 1;
                }
                Err(err) => {
                    tracing::error!(spotify_id = %spotify_id, error = %err, "Failed to create artist from Spotify");
                }
            }
        }

        tracing::info!(created, already_existed, "Spotify artist creation completed");
        Ok(JobOutcome::Created {
            created,
            already_existed,
        })
    }

    async fn replace_vevo_channel(&self, artist_id: ArtistId) -> Result<JobOutcome, ServiceError> {
        let Some(artist) = self.repository.find_artist(artist_id).await? else {
            tracing::warn!(artist_id, "Artist for channel replacement no longer exists");
            return Ok(JobOutcome::ArtistMissing(artist_id));
        };

        match self.replacement.process(&artist).await {
            Ok(outcome) => Ok(JobOutcome::Replacement(outcome)),
            Err(err) if err.is_throttled() => {
                tracing::warn!(artist_id, error = %err, "Channel replacement blocked by quota, retrying later");
                self.queue
                    .enqueue(Job::ReplaceVevoChannel { artist_id }, Some(QUOTA_RETRY_DELAY))
                    .await?;
                Ok(JobOutcome::Requeued {
                    delay: QUOTA_RETRY_DELAY,
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Runs jobs from a `ChannelQueue`, each after its delay, until the queue is dropped.
pub fn spawn_worker(runner: Arc<JobRunner>, mut receiver: UnboundedReceiver<QueuedJob>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(QueuedJob { job, delay }) = receiver.recv().await {
            let runner = runner.clone();
            tokio::spawn(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let name = job.name();
                match runner.run(job).await {
                    Ok(outcome) => tracing::debug!(job = name, outcome = ?outcome, "Job finished"),
                    Err(err) => tracing::error!(job = name, error = %err, "Job failed"),
                }
            });
        }
    })
}
