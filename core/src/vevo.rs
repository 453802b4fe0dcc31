use chrono::{DateTime, TimeDelta, Utc};

use crate::artist::LinkRecord;
use crate::channel::ChannelCandidate;

const VEVO_DESCRIPTION_PHRASES: [&str; 4] = [
    "vevo",
    "official music video",
    "redirects to",
    "visit the official channel",
];

const CHANNEL_PATH_MARKER: &str = "youtube.com/channel/";

/// Configuration for VEVO detection
#[derive(Debug, Clone)]
pub struct VevoConfig {
    pub enabled: bool,
    /// Shared by the per-artist and per-link recheck timers
    pub recheck_window: TimeDelta,
    /// Lifetime of the per-artist "checked recently" marker
    pub cache_ttl: std::time::Duration,
}

impl VevoConfig {
    pub fn new(enabled: bool, recheck_days: i64, cache_ttl: std::time::Duration) -> Self {
        Self {
            enabled,
            recheck_window: TimeDelta::days(recheck_days),
            cache_ttl,
        }
    }
}

impl Default for VevoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recheck_window: TimeDelta::days(7),
            cache_ttl: std::time::Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Any single signal is enough: a "vevo" title, no uploads, or a redirect-style description.
pub fn is_vevo_channel(channel: &ChannelCandidate) -> bool {
    if channel.title_lowercase().contains("vevo") {
        return true;
    }

    if channel.video_count == 0 {
        return true;
    }

    let description = channel.description.as_deref().unwrap_or_default().to_lowercase();
    VEVO_DESCRIPTION_PHRASES
        .iter()
        .any(|phrase| description.contains(phrase))
}

/// Only `/channel/<id>` URLs carry the id; handles, `/c/` and `/user/` URLs need an API lookup.
pub fn extract_channel_id_from_url(url: &str) -> Option<String> {
    let start = url.find(CHANNEL_PATH_MARKER)? + CHANNEL_PATH_MARKER.len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    (!id.is_empty()).then_some(id)
}

/// Decides whether an artist is due for a VEVO check from its YouTube links.
///
/// The enabled flag and the per-artist recently-checked marker are the caller's concern.
pub fn artist_needs_check(
    channel_id: Option<&str>,
    youtube_links: &[LinkRecord],
    now: DateTime<Utc>,
    window: TimeDelta,
) -> bool {
    let mut unverified = youtube_links.iter().filter(|link| link.is_unverified()).peekable();

    match channel_id {
        None => {
            if unverified.peek().is_some() {
                return unverified.any(|link| link.needs_vevo_check(now, window));
            }
            // Never-checked artists are always eligible
            !youtube_links.iter().any(|link| link.checked_within(now, window))
        }
        Some(_) => {
            // No unverified link backs the confirmed channel yet
            if unverified.peek().is_none() {
                return true;
            }
            unverified.any(|link| link.needs_vevo_check(now, window))
        }
    }
}

/// Links that `mark_artist_as_checked` should stamp for a given channel.
///
/// With a channel id only the matching link (or one whose id cannot be read) qualifies.
pub fn links_to_mark<'a>(youtube_links: &'a [LinkRecord], channel_id: Option<&str>) -> Vec<&'a LinkRecord> {
    youtube_links
        .iter()
        .filter(|link| link.is_unverified())
        .filter(|link| match channel_id {
            None => true,
            Some(channel_id) => link
                .channel_id()
                .is_none_or(|link_channel| link_channel == channel_id),
        })
        .collect()
}
