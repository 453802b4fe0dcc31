use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::vevo::extract_channel_id_from_url;

pub type ArtistId = i64;
pub type LinkId = i64;

/// An artist as the persistence layer hands it to the services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub id: ArtistId,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub spotify_id: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl ArtistRecord {
    pub fn new(id: ArtistId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            aliases: Vec::new(),
            spotify_id: None,
            youtube_channel_id: None,
            image_url: None,
            genres: Vec::new(),
            deleted: false,
        }
    }

    pub fn youtube_channel(&self) -> Option<&str> {
        self.youtube_channel_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn has_youtube_channel(&self) -> bool {
        self.youtube_channel().is_some()
    }

    /// Primary name followed by every non-blank alias, case-insensitive duplicates dropped.
    pub fn identity_names(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty() && seen.insert(name.to_lowercase()))
            .collect()
    }
}

/// Alias entries arrive either as bare strings or as `{ "name": ... }` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasEntry {
    Plain(String),
    Named { name: Option<String> },
}

impl AliasEntry {
    pub fn into_name(self) -> Option<String> {
        let raw = match self {
            AliasEntry::Plain(name) => name,
            AliasEntry::Named { name } => name?,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

pub fn normalize_aliases(entries: impl IntoIterator<Item = AliasEntry>) -> Vec<String> {
    entries.into_iter().filter_map(AliasEntry::into_name).collect()
}

/// Artist data as returned by the streaming catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistExternalProfile {
    pub spotify_id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub popularity: u8,
    pub followers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    Youtube,
    Instagram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PublicAdded,
    AdminAdded,
    PendingApproval,
    Approved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub artist_id: ArtistId,
    pub platform: Platform,
    pub url: String,
    pub review_status: ReviewStatus,
    pub vevo_checked_at: Option<DateTime<Utc>>,
}

impl LinkRecord {
    pub fn is_unverified(&self) -> bool {
        self.review_status != ReviewStatus::Approved
    }

    pub fn channel_id(&self) -> Option<String> {
        extract_channel_id_from_url(&self.url)
    }

    pub fn checked_within(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.vevo_checked_at
            .is_some_and(|checked_at| checked_at > now - window)
    }

    /// A link needs a VEVO check when it was never checked or its window elapsed.
    pub fn needs_vevo_check(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        !self.checked_within(now, window)
    }
}

/// Fields for a link that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub artist_id: ArtistId,
    pub platform: Platform,
    pub url: String,
    pub review_status: ReviewStatus,
    pub vevo_checked_at: Option<DateTime<Utc>>,
}

pub fn youtube_channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{}", channel_id)
}
