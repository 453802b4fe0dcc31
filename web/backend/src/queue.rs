use std::time::Duration;

use async_trait::async_trait;
use lineupscout_core::{ArtistExternalProfile, ArtistId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Background work handed to the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum Job {
    #[serde(rename_all = "camelCase")]
    FetchYoutubeData {
        artist_ids: Vec<ArtistId>,
        batch_size_hint: usize,
    },
    CreateArtistsFromSpotify {
        artists: Vec<ArtistExternalProfile>,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceVevoChannel { artist_id: ArtistId },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::FetchYoutubeData { .. } => "fetch_youtube_data",
            Job::CreateArtistsFromSpotify { .. } => "create_artists_from_spotify",
            Job::ReplaceVevoChannel { .. } => "replace_vevo_channel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub job: Job,
    pub delay: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError>;
}

/// Keeps every enqueued job in memory without running it.
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<QueuedJob>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<QueuedJob> {
        std::mem::take(&mut *self.jobs.lock().await)
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError> {
        self.jobs.lock().await.push(QueuedJob { job, delay });
        Ok(())
    }
}

/// Hands jobs to an in-process worker over a channel.
#[derive(Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
}

impl ChannelQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for ChannelQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<(), QueueError> {
        tracing::debug!(job = job.name(), delay_secs = delay.map(|d| d.as_secs()), "Enqueued job");
        self.sender
            .send(QueuedJob { job, delay })
            .map_err(|_| QueueError::Closed)
    }
}
