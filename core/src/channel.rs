use serde::{Deserialize, Serialize};

/// A YouTube channel considered for an artist.
///
/// The channel id is fixed at construction; everything else may be filled in
/// from statistics responses or search snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCandidate {
    channel_id: String,
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
    pub subscriber_count_hidden: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_verified: bool,
    pub has_recent_activity: bool,
    pub uploads_playlist_id: Option<String>,
}

impl ChannelCandidate {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            subscriber_count: 0,
            video_count: 0,
            view_count: 0,
            subscriber_count_hidden: false,
            title: None,
            description: None,
            is_verified: false,
            has_recent_activity: false,
            uploads_playlist_id: None,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn with_subscribers(mut self, subscriber_count: u64) -> Self {
        self.subscriber_count = subscriber_count;
        self
    }

    pub fn with_videos(mut self, video_count: u64) -> Self {
        self.video_count = video_count;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    /// Channels with at least one upload count as having active content.
    pub fn has_active_content(&self) -> bool {
        self.video_count > 0
    }

    /// Fill in title/description from a search snippet when the details call left them out.
    pub fn enrich_with_snippet(&mut self, title: Option<&str>, description: Option<&str>) {
        if let Some(title) = title {
            self.title = Some(title.to_string());
        }
        if let Some(description) = description {
            self.description = Some(description.to_string());
        }
    }

    pub fn title_lowercase(&self) -> String {
        self.title.as_deref().unwrap_or_default().to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStatistics {
    pub video_id: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Averages over a channel's recent uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalytics {
    pub videos_analyzed: u32,
    pub average_views: f64,
    pub average_likes: f64,
    pub average_comments: f64,
    pub video_ids: Vec<String>,
}

impl VideoAnalytics {
    /// `None` when there is nothing to average.
    pub fn from_videos(videos: &[VideoStatistics]) -> Option<Self> {
        if videos.is_empty() {
            return None;
        }

        let count = videos.len() as f64;
        let total = |field: fn(&VideoStatistics) -> u64| -> f64 {
            videos.iter().map(field).sum::<u64>() as f64
        };

        Some(Self {
            videos_analyzed: videos.len() as u32,
            average_views: total(|v| v.view_count) / count,
            average_likes: total(|v| v.like_count) / count,
            average_comments: total(|v| v.comment_count) / count,
            video_ids: videos.iter().map(|v| v.video_id.clone()).collect(),
        })
    }
}
