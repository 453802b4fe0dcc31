use std::sync::Arc;

use chrono::Utc;
use lineupscout_core::{
    ArtistRecord, ChannelCandidate, ChannelRanker, NewLink, Platform, ReviewStatus, extract_channel_id_from_url,
    youtube_channel_url,
};
use rustc_hash::FxHashSet;

use crate::channel_search::{CandidateSearch, ChannelSearchService};
use crate::error::{ApiError, ServiceError};
use crate::repository::{ArtistRepository, ArtistUpdate, LinkUpdate};
use crate::vevo_detection::VevoDetectionService;
use crate::youtube::{LIST_COST, YouTubeClient};

/// Where a newly assigned channel came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    ApprovedLink,
    ExistingLinks,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementOutcome {
    NotDue,
    /// The artist's current channel could not be fetched.
    ChannelUnavailable,
    NotVevo,
    NoCandidates,
    NoQualifyingCandidate,
    RejectedReplacement { candidate_id: String },
    Replaced { old_channel_id: String, new_channel_id: String },
    Populated { channel_id: String, source: ChannelSource },
}

/// Replaces VEVO channels and discovers channels for artists that have none.
pub struct ChannelReplacementService {
    repository: Arc<dyn ArtistRepository>,
    youtube: Arc<YouTubeClient>,
    detection: Arc<VevoDetectionService>,
    search: Arc<ChannelSearchService>,
    ranker: ChannelRanker,
}

impl ChannelReplacementService {
    pub fn new(
        repository: Arc<dyn ArtistRepository>,
        youtube: Arc<YouTubeClient>,
        detection: Arc<VevoDetectionService>,
        search: Arc<ChannelSearchService>,
        ranker: ChannelRanker,
    ) -> Self {
        Self {
            repository,
            youtube,
            detection,
            search,
            ranker,
        }
    }

    /// Runs detection and, when needed, replacement for one artist.
    ///
    /// Fails with a quota error when searching was throttled before any candidate was found,
    /// so the caller can try again later.
    pub async fn process(&self, artist: &ArtistRecord) -> Result<ReplacementOutcome, ServiceError> {
        tracing::info!(
            artist_id = artist.id,
            artist_name = %artist.name,
            youtube_channel_id = artist.youtube_channel().unwrap_or_default(),
            "Processing channel replacement"
        );

        if !self.detection.should_check_artist(artist).await? {
            tracing::debug!(artist_id = artist.id, "Artist checked recently");
            return Ok(ReplacementOutcome::NotDue);
        }

        let Some(current_id) = artist.youtube_channel() else {
            return self.populate_channel(artist).await;
        };

        let Some(current) = self.current_channel(artist, current_id).await? else {
            tracing::warn!(artist_id = artist.id, channel_id = current_id, "Could not fetch current channel data");
            return Ok(ReplacementOutcome::ChannelUnavailable);
        };

        if !self.detection.detect_for_artist(artist, Some(&current)).await? {
            tracing::debug!(artist_id = artist.id, channel_id = current_id, "Current channel is not VEVO");
            return Ok(ReplacementOutcome::NotVevo);
        }

        let candidates = self.usable_candidates(artist, self.search.search_candidates_for_artist(artist).await)?;
        if candidates.is_empty() {
            tracing::info!(artist_id = artist.id, "No alternative channels found");
            return Ok(ReplacementOutcome::NoCandidates);
        }

        let Some(best) = self.ranker.select_best(&candidates) else {
            tracing::info!(
                artist_id = artist.id,
                candidate_count = candidates.len(),
                "No channels meet minimum requirements"
            );
            return Ok(ReplacementOutcome::NoQualifyingCandidate);
        };

        if !self.ranker.is_valid_replacement(&best, Some(&current)) {
            tracing::info!(
                artist_id = artist.id,
                replacement_channel_id = best.channel_id(),
                replacement_subscribers = best.subscriber_count,
                "Replacement channel does not meet quality requirements"
            );
            return Ok(ReplacementOutcome::RejectedReplacement {
                candidate_id: best.channel_id().to_string(),
            });
        }

        self.promote_channel(artist, &best).await?;
        tracing::info!(
            artist_id = artist.id,
            old_channel_id = current_id,
            new_channel_id = best.channel_id(),
            new_subscriber_count = best.subscriber_count,
            "Replaced VEVO channel"
        );

        Ok(ReplacementOutcome::Replaced {
            old_channel_id: current_id.to_string(),
            new_channel_id: best.channel_id().to_string(),
        })
    }

    /// An approved link wins outright; then the best unverified link; then search.
    async fn populate_channel(&self, artist: &ArtistRecord) -> Result<ReplacementOutcome, ServiceError> {
        let links = self.repository.get_links_by_platform(artist.id, Platform::Youtube).await?;

        let approved_channel = links
            .iter()
            .find(|link| link.review_status == ReviewStatus::Approved)
            .and_then(|link| extract_channel_id_from_url(&link.url));
        if let Some(channel_id) = approved_channel {
            if let Some(channel) = self.youtube.channel_metrics(&channel_id).await? {
                return self.adopt(artist, &channel, ChannelSource::ApprovedLink).await;
            }
        }

        let mut seen = FxHashSet::default();
        let mut from_links = Vec::new();
        for link in links.iter().filter(|link| link.is_unverified()) {
            let Some(channel_id) = link.channel_id() else {
                continue;
            };
            if !seen.insert(channel_id.clone()) {
                continue;
            }
            if let Some(channel) = self.youtube.channel_metrics(&channel_id).await? {
                from_links.push(channel);
            }
        }

        if !from_links.is_empty() {
            tracing::info!(
                artist_id = artist.id,
                channel_count = from_links.len(),
                "Found channels from existing unverified links"
            );
            if let Some(best) = self.ranker.select_best(&from_links) {
                return self.adopt(artist, &best, ChannelSource::ExistingLinks).await;
            }
        }

        tracing::info!(artist_id = artist.id, artist_name = %artist.name, "No channel id, searching for channel");
        let candidates = self.usable_candidates(artist, self.search.search_candidates_for_artist(artist).await)?;
        if candidates.is_empty() {
            tracing::info!(artist_id = artist.id, "No channels found for artist");
            self.detection.mark_artist_as_checked(artist, None).await?;
            return Ok(ReplacementOutcome::NoCandidates);
        }

        match self.ranker.select_best(&candidates) {
            Some(best) => self.adopt(artist, &best, ChannelSource::Search).await,
            None => {
                tracing::info!(
                    artist_id = artist.id,
                    candidate_count = candidates.len(),
                    "No channels meet minimum requirements"
                );
                self.detection.mark_artist_as_checked(artist, None).await?;
                Ok(ReplacementOutcome::NoQualifyingCandidate)
            }
        }
    }

    /// The artist's current channel; a fetch blocked by the quota is an error rather than a miss.
    async fn current_channel(
        &self,
        artist: &ArtistRecord,
        channel_id: &str,
    ) -> Result<Option<ChannelCandidate>, ServiceError> {
        let mut batch = self.youtube.channel_metrics_batch(&[channel_id.to_string()]).await?;
        if let Some(channel) = batch.channels.remove(channel_id) {
            return Ok(Some(channel));
        }

        if !batch.is_complete() && !self.youtube.quota().check_availability(LIST_COST).await {
            tracing::warn!(artist_id = artist.id, channel_id, "Current channel fetch blocked by quota");
            return Err(ApiError::QuotaExhausted { cost: LIST_COST }.into());
        }
        Ok(None)
    }

    fn usable_candidates(
        &self,
        artist: &ArtistRecord,
        search: CandidateSearch,
    ) -> Result<Vec<ChannelCandidate>, ServiceError> {
        match search.throttled {
            Some(err) if search.candidates.is_empty() => {
                tracing::warn!(artist_id = artist.id, error = %err, "Channel search throttled before any result");
                Err(err.into())
            }
            _ => Ok(search.candidates),
        }
    }

    async fn adopt(
        &self,
        artist: &ArtistRecord,
        channel: &ChannelCandidate,
        source: ChannelSource,
    ) -> Result<ReplacementOutcome, ServiceError> {
        self.promote_channel(artist, channel).await?;
        self.detection
            .mark_artist_as_checked(artist, Some(channel.channel_id()))
            .await?;

        tracing::info!(
            artist_id = artist.id,
            channel_id = channel.channel_id(),
            channel_title = channel.title.as_deref().unwrap_or_default(),
            subscriber_count = channel.subscriber_count,
            source = ?source,
            "Populated YouTube channel"
        );

        Ok(ReplacementOutcome::Populated {
            channel_id: channel.channel_id().to_string(),
            source,
        })
    }

    /// Makes `channel` the artist's channel and points its YouTube link at it, pending approval.
    pub async fn promote_channel(&self, artist: &ArtistRecord, channel: &ChannelCandidate) -> Result<(), ServiceError> {
        let now = Utc::now();
        let url = youtube_channel_url(channel.channel_id());

        self.repository
            .update_artist(
                artist.id,
                ArtistUpdate {
                    youtube_channel_id: Some(channel.channel_id().to_string()),
                    ..ArtistUpdate::default()
                },
            )
            .await?;

        let existing = self
            .repository
            .get_links_by_platform(artist.id, Platform::Youtube)
            .await?
            .into_iter()
            .next();

        match existing {
            Some(link) => {
                self.repository
                    .update_link(
                        link.id,
                        LinkUpdate {
                            url: Some(url),
                            review_status: Some(ReviewStatus::PendingApproval),
                            vevo_checked_at: Some(now),
                        },
                    )
                    .await?;
            }
            None => {
                self.repository
                    .create_link(NewLink {
                        artist_id: artist.id,
                        platform: Platform::Youtube,
                        url,
                        review_status: ReviewStatus::PendingApproval,
                        vevo_checked_at: Some(now),
                    })
                    .await?;
            }
        }

        Ok(())
    }
}
