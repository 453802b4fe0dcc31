use std::sync::Arc;

use chrono::Utc;
use lineupscout_core::vevo::{artist_needs_check, links_to_mark};
use lineupscout_core::{
    ArtistRecord, ChannelCandidate, LinkRecord, NewLink, Platform, ReviewStatus, VevoConfig, is_vevo_channel,
    youtube_channel_url,
};

use crate::cache::{CacheKey, KeyValueStore, ResponseCache};
use crate::repository::{ArtistRepository, RepoError};

/// Decides when an artist's YouTube channel is due for a VEVO check and records the checks.
pub struct VevoDetectionService {
    repository: Arc<dyn ArtistRepository>,
    cache: ResponseCache,
    config: VevoConfig,
}

impl VevoDetectionService {
    pub fn new(repository: Arc<dyn ArtistRepository>, store: Arc<dyn KeyValueStore>, config: VevoConfig) -> Self {
        Self {
            repository,
            cache: ResponseCache::new(store),
            config,
        }
    }

    pub fn is_vevo_channel(&self, channel: &ChannelCandidate) -> bool {
        is_vevo_channel(channel)
    }

    pub async fn should_check_artist(&self, artist: &ArtistRecord) -> Result<bool, RepoError> {
        if !self.config.enabled {
            return Ok(false);
        }

        let marker = CacheKey::VevoDetection(artist.id).to_string();
        if self.cache.store().has(&marker).await {
            return Ok(false);
        }

        let links = self.repository.get_links_by_platform(artist.id, Platform::Youtube).await?;
        Ok(artist_needs_check(
            artist.youtube_channel(),
            &links,
            Utc::now(),
            self.config.recheck_window,
        ))
    }

    pub async fn unverified_youtube_links(&self, artist: &ArtistRecord) -> Result<Vec<LinkRecord>, RepoError> {
        let links = self.repository.get_links_by_platform(artist.id, Platform::Youtube).await?;
        Ok(links.into_iter().filter(LinkRecord::is_unverified).collect())
    }

    /// Classifies the artist's current channel, marks the links checked and remembers the result.
    ///
    /// Returns `false` without side effects when the artist is not due or no channel data is available.
    pub async fn detect_for_artist(
        &self,
        artist: &ArtistRecord,
        channel: Option<&ChannelCandidate>,
    ) -> Result<bool, RepoError> {
        if !self.should_check_artist(artist).await? {
            return Ok(false);
        }

        let Some(channel) = channel else {
            tracing::debug!(artist_id = artist.id, "VEVO detection skipped: no channel data");
            return Ok(false);
        };

        let is_vevo = self.is_vevo_channel(channel);
        self.mark_artist_as_checked(artist, Some(channel.channel_id())).await?;
        self.cache
            .put(&CacheKey::VevoDetection(artist.id), &is_vevo, self.config.cache_ttl)
            .await;

        if is_vevo {
            tracing::info!(
                artist_id = artist.id,
                artist_name = %artist.name,
                channel_id = channel.channel_id(),
                channel_title = channel.title.as_deref().unwrap_or_default(),
                video_count = channel.video_count,
                "VEVO channel detected"
            );
        }

        Ok(is_vevo)
    }

    /// Stamps the artist's unverified YouTube links as checked now.
    ///
    /// An artist without any YouTube link but with a known channel gets one created.
    pub async fn mark_artist_as_checked(&self, artist: &ArtistRecord, channel_id: Option<&str>) -> Result<(), RepoError> {
        let now = Utc::now();
        let links = self.repository.get_links_by_platform(artist.id, Platform::Youtube).await?;

        for link in links_to_mark(&links, channel_id) {
            self.repository.update_link_checked_timestamp(link.id, now).await?;
        }

        if links.is_empty() {
            if let Some(channel_id) = channel_id.or(artist.youtube_channel()) {
                self.repository
                    .create_link(NewLink {
                        artist_id: artist.id,
                        platform: Platform::Youtube,
                        url: youtube_channel_url(channel_id),
                        review_status: ReviewStatus::PublicAdded,
                        vevo_checked_at: Some(now),
                    })
                    .await?;
            }
        }

        Ok(())
    }
}
