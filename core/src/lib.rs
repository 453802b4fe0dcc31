pub mod artist;
pub mod channel;
pub mod lineup_stack;
pub mod metrics;
pub mod priority;
pub mod ranking;
pub mod scoring;
pub mod string_normalization;
pub mod vevo;

// Re-export commonly used items
pub use artist::{
    AliasEntry, ArtistExternalProfile, ArtistId, ArtistRecord, LinkId, LinkRecord, NewLink, Platform, ReviewStatus,
    normalize_aliases, youtube_channel_url,
};
pub use channel::{ChannelCandidate, VideoAnalytics, VideoStatistics};
pub use lineup_stack::{AlternativesStack, StackError, StackRemoval};
pub use metrics::{FreshnessConfig, MetricsRecord, MetricsUpdate};
pub use priority::{PlannedBatch, RefreshPriority, classify_refresh_priority};
pub use ranking::{ChannelRanker, RankingConfig};
pub use scoring::{ArtistTier, MetricPreset, calculate_score, suggest_tier};
pub use vevo::{VevoConfig, extract_channel_id_from_url, is_vevo_channel};
