use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lineupscout_core::string_normalization::clean_str;
use lineupscout_core::{
    ArtistId, ArtistRecord, LinkId, LinkRecord, MetricsRecord, MetricsUpdate, NewLink, Platform,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};

use super::{ArtistRepository, ArtistSeed, ArtistUpdate, LinkUpdate, NewArtist, RepoError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RepositoryData {
    artists: FxHashMap<ArtistId, ArtistRecord>,
    metrics: FxHashMap<ArtistId, MetricsRecord>,
    links: FxHashMap<LinkId, LinkRecord>,
    next_artist_id: ArtistId,
    next_link_id: LinkId,
}

impl RepositoryData {
    fn live_artist(&self, id: ArtistId) -> Option<&ArtistRecord> {
        self.artists.get(&id).filter(|artist| !artist.deleted)
    }
}

/// Process-local repository, optionally snapshotted to a bincode file.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    data: Arc<RwLock<RepositoryData>>,
    dirty: Arc<RwLock<bool>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot_path: PathBuf) -> Self {
        Self {
            snapshot_path: Some(snapshot_path),
            ..Self::default()
        }
    }

    async fn mark_dirty(&self) {
        let mut dirty = self.dirty.write().await;
        *dirty = true;
    }

    /// Stores a fully formed artist, keeping its id.
    pub async fn insert_artist(&self, artist: ArtistRecord) {
        {
            let mut data = self.data.write().await;
            data.next_artist_id = data.next_artist_id.max(artist.id);
            data.artists.insert(artist.id, artist);
        }
        self.mark_dirty().await;
    }

    pub async fn insert_metrics(&self, metrics: MetricsRecord) {
        {
            let mut data = self.data.write().await;
            data.metrics.insert(metrics.artist_id, metrics);
        }
        self.mark_dirty().await;
    }

    pub async fn seed(&self, seeds: Vec<ArtistSeed>) -> Result<usize, RepoError> {
        let mut created = 0;
        for seed in seeds {
            if let Some(spotify_id) = &seed.spotify_id {
                if self.find_artist_by_external_id(spotify_id).await?.is_some() {
                    continue;
                }
            }
            self.create_artist(seed.into()).await?;
            created += 1;
        }
        Ok(created)
    }

    pub async fn artist_count(&self) -> usize {
        self.data.read().await.artists.len()
    }

    pub async fn load_snapshot(&self) -> tokio::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "No repository snapshot found, starting empty");
            return Ok(());
        }

        let file_contents = tokio::fs::read(path).await?;

        match bincode::deserialize::<RepositoryData>(&file_contents) {
            Ok(loaded) => {
                let mut data = self.data.write().await;
                *data = loaded;
                tracing::info!(artists = data.artists.len(), "Loaded repository snapshot");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deserialize repository snapshot (will start fresh)");
                Ok(())
            }
        }
    }

    pub fn start_periodic_snapshots(&self) {
        if self.snapshot_path.is_none() {
            return;
        }
        let repository = self.clone();
        tokio::spawn(async move {
            repository.periodic_snapshot_task().await;
        });
    }

    async fn periodic_snapshot_task(&self) {
        let mut interval = interval(Duration::from_secs(30));

        loop {
            interval.tick().await;

            if let Err(e) = self.flush_snapshot().await {
                tracing::error!(error = %e, "Failed to write repository snapshot");
            }
        }
    }

    pub async fn is_dirty(&self) -> bool {
        *self.dirty.read().await
    }

    /// Writes a snapshot when something changed since the last one. Returns whether it wrote.
    ///
    /// The flag is cleared before writing so changes made during the write stay pending.
    pub async fn flush_snapshot(&self) -> tokio::io::Result<bool> {
        let was_dirty = std::mem::replace(&mut *self.dirty.write().await, false);
        if !was_dirty {
            return Ok(false);
        }

        if let Err(e) = self.write_snapshot().await {
            self.mark_dirty().await;
            return Err(e);
        }
        Ok(true)
    }

    pub async fn write_snapshot(&self) -> tokio::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let data = self.data.read().await;
        let serialized = bincode::serialize(&*data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // Write to temp file first, then atomic rename
        let temp_path = path.with_extension("bin.tmp");
        tokio::fs::write(&temp_path, serialized).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }
}

fn matches_query(artist: &ArtistRecord, normalized_query: &str) -> bool {
    std::iter::once(&artist.name)
        .chain(artist.aliases.iter())
        .any(|name| clean_str(name).contains(normalized_query))
}

#[async_trait]
impl ArtistRepository for InMemoryRepository {
    async fn find_artist(&self, id: ArtistId) -> Result<Option<ArtistRecord>, RepoError> {
        Ok(self.data.read().await.live_artist(id).cloned())
    }

    async fn find_artists(&self, ids: &[ArtistId]) -> Result<Vec<ArtistRecord>, RepoError> {
        let data = self.data.read().await;
        Ok(ids.iter().filter_map(|id| data.live_artist(*id).cloned()).collect())
    }

    async fn find_artist_by_external_id(&self, spotify_id: &str) -> Result<Option<ArtistRecord>, RepoError> {
        let data = self.data.read().await;
        Ok(data
            .artists
            .values()
            .find(|artist| !artist.deleted && artist.spotify_id.as_deref() == Some(spotify_id))
            .cloned())
    }

    async fn find_artists_by_external_ids(&self, spotify_ids: &[String]) -> Result<Vec<ArtistRecord>, RepoError> {
        let data = self.data.read().await;
        Ok(data
            .artists
            .values()
            .filter(|artist| {
                artist
                    .spotify_id
                    .as_ref()
                    .is_some_and(|id| spotify_ids.contains(id))
            })
            .cloned()
            .collect())
    }

    async fn search_local(&self, query: &str, limit: usize) -> Result<Vec<ArtistRecord>, RepoError> {
        let normalized_query = clean_str(query);
        if normalized_query.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.data.read().await;
        let mut results: Vec<ArtistRecord> = data
            .artists
            .values()
            .filter(|artist| !artist.deleted && matches_query(artist, &normalized_query))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            let a_starts = clean_str(&a.name).starts_with(&normalized_query);
            let b_starts = clean_str(&b.name).starts_with(&normalized_query);

            match (a_starts, b_starts) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.name.len().cmp(&b.name.len()).then(a.id.cmp(&b.id)),
            }
        });

        results.truncate(limit);
        Ok(results)
    }

    async fn create_artist(&self, artist: NewArtist) -> Result<ArtistRecord, RepoError> {
        let record = {
            let mut data = self.data.write().await;
            data.next_artist_id += 1;
            let record = ArtistRecord {
                id: data.next_artist_id,
                name: artist.name,
                aliases: artist.aliases,
                spotify_id: artist.spotify_id,
                youtube_channel_id: artist.youtube_channel_id,
                image_url: artist.image_url,
                genres: artist.genres,
                deleted: false,
            };
            data.artists.insert(record.id, record.clone());
            record
        };
        self.mark_dirty().await;
        Ok(record)
    }

    async fn update_artist(&self, id: ArtistId, update: ArtistUpdate) -> Result<ArtistRecord, RepoError> {
        let record = {
            let mut data = self.data.write().await;
            let artist = data
                .artists
                .get_mut(&id)
                .filter(|artist| !artist.deleted)
                .ok_or(RepoError::ArtistNotFound(id))?;

            if let Some(name) = update.name {
                artist.name = name;
            }
            if let Some(spotify_id) = update.spotify_id {
                artist.spotify_id = Some(spotify_id);
            }
            if let Some(channel_id) = update.youtube_channel_id {
                artist.youtube_channel_id = Some(channel_id);
            }
            if let Some(image_url) = update.image_url {
                artist.image_url = image_url;
            }
            if let Some(genres) = update.genres {
                artist.genres = genres;
            }
            artist.clone()
        };
        self.mark_dirty().await;
        Ok(record)
    }

    async fn get_metrics(&self, artist_id: ArtistId) -> Result<Option<MetricsRecord>, RepoError> {
        Ok(self.data.read().await.metrics.get(&artist_id).cloned())
    }

    async fn get_or_create_metrics(&self, artist_id: ArtistId) -> Result<MetricsRecord, RepoError> {
        self.update_metrics(artist_id, MetricsUpdate::default()).await
    }

    async fn update_metrics(&self, artist_id: ArtistId, update: MetricsUpdate) -> Result<MetricsRecord, RepoError> {
        let record = {
            let mut data = self.data.write().await;
            if !data.artists.contains_key(&artist_id) {
                return Err(RepoError::ArtistNotFound(artist_id));
            }
            let metrics = data
                .metrics
                .entry(artist_id)
                .or_insert_with(|| MetricsRecord::new(artist_id));
            metrics.apply(&update);
            metrics.clone()
        };
        self.mark_dirty().await;
        Ok(record)
    }

    async fn get_links_by_platform(
        &self,
        artist_id: ArtistId,
        platform: Platform,
    ) -> Result<Vec<LinkRecord>, RepoError> {
        let data = self.data.read().await;
        let mut links: Vec<LinkRecord> = data
            .links
            .values()
            .filter(|link| link.artist_id == artist_id && link.platform == platform)
            .cloned()
            .collect();
        links.sort_by_key(|link| link.id);
        Ok(links)
    }

    async fn create_link(&self, link: NewLink) -> Result<LinkRecord, RepoError> {
        let record = {
            let mut data = self.data.write().await;
            if !data.artists.contains_key(&link.artist_id) {
                return Err(RepoError::ArtistNotFound(link.artist_id));
            }
            data.next_link_id += 1;
            let record = LinkRecord {
                id: data.next_link_id,
                artist_id: link.artist_id,
                platform: link.platform,
                url: link.url,
                review_status: link.review_status,
                vevo_checked_at: link.vevo_checked_at,
            };
            data.links.insert(record.id, record.clone());
            record
        };
        self.mark_dirty().await;
        Ok(record)
    }

    async fn update_link(&self, link_id: LinkId, update: LinkUpdate) -> Result<LinkRecord, RepoError> {
        let record = {
            let mut data = self.data.write().await;
            let link = data
                .links
                .get_mut(&link_id)
                .ok_or(RepoError::LinkNotFound(link_id))?;

            if let Some(url) = update.url {
                link.url = url;
            }
            if let Some(status) = update.review_status {
                link.review_status = status;
            }
            if let Some(at) = update.vevo_checked_at {
                link.vevo_checked_at = Some(at);
            }
            link.clone()
        };
        self.mark_dirty().await;
        Ok(record)
    }

    async fn update_link_checked_timestamp(&self, link_id: LinkId, at: DateTime<Utc>) -> Result<(), RepoError> {
        self.update_link(
            link_id,
            LinkUpdate {
                vevo_checked_at: Some(at),
                ..LinkUpdate::default()
            },
        )
        .await
        .map(|_| ())
    }
}
