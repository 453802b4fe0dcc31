use serde::{Deserialize, Serialize};

use crate::metrics::MetricsRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMetric {
    SpotifyMonthlyListeners,
    SpotifyPopularity,
    YoutubeSubscribers,
    SpotifyFollowers,
    InstagramFollowers,
}

impl ScoringMetric {
    /// Value treated as 100 after log normalization.
    pub fn normalization_max(self) -> f64 {
        match self {
            ScoringMetric::SpotifyMonthlyListeners => 100_000_000.0,
            ScoringMetric::SpotifyPopularity => 100.0,
            ScoringMetric::YoutubeSubscribers => 50_000_000.0,
            ScoringMetric::SpotifyFollowers => 100_000_000.0,
            ScoringMetric::InstagramFollowers => 500_000_000.0,
        }
    }

    pub fn value_from(self, metrics: &MetricsRecord) -> f64 {
        let value = match self {
            // No monthly listener feed yet; followers stand in
            ScoringMetric::SpotifyMonthlyListeners | ScoringMetric::SpotifyFollowers => metrics.spotify_followers,
            ScoringMetric::SpotifyPopularity => metrics.spotify_popularity.map(u64::from),
            ScoringMetric::YoutubeSubscribers => metrics.youtube_subscribers,
            ScoringMetric::InstagramFollowers => metrics.instagram_followers,
        };
        value.unwrap_or(0) as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPreset {
    #[default]
    Balanced,
    StreamingFocused,
    SocialMediaFocused,
}

impl MetricPreset {
    pub fn weights(self) -> [(ScoringMetric, f64); 3] {
        use ScoringMetric::*;
        match self {
            MetricPreset::Balanced => [
                (SpotifyMonthlyListeners, 0.40),
                (SpotifyPopularity, 0.30),
                (YoutubeSubscribers, 0.30),
            ],
            MetricPreset::StreamingFocused => [
                (SpotifyMonthlyListeners, 0.55),
                (SpotifyPopularity, 0.30),
                (YoutubeSubscribers, 0.15),
            ],
            MetricPreset::SocialMediaFocused => [
                (SpotifyMonthlyListeners, 0.20),
                (SpotifyPopularity, 0.15),
                (YoutubeSubscribers, 0.65),
            ],
        }
    }
}

/// `log10(value + 1) / log10(max) * 100`, clamped to 0..=100. Popularity is already on that scale.
pub fn normalize_logarithmic(value: f64, metric: ScoringMetric) -> f64 {
    if metric == ScoringMetric::SpotifyPopularity {
        return value.clamp(0.0, 100.0);
    }
    if value <= 0.0 {
        return 0.0;
    }
    let normalized = (value + 1.0).log10() / metric.normalization_max().log10() * 100.0;
    normalized.clamp(0.0, 100.0)
}

pub fn calculate_score(metrics: Option<&MetricsRecord>, preset: MetricPreset) -> u32 {
    let Some(metrics) = metrics else {
        return 0;
    };

    let score: f64 = preset
        .weights()
        .iter()
        .map(|&(metric, weight)| normalize_logarithmic(metric.value_from(metrics), metric) * weight)
        .sum();

    score.round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtistTier {
    Headliner,
    SubHeadliner,
    MidTier,
    Undercard,
}

impl ArtistTier {
    pub const ALL: [ArtistTier; 4] = [
        ArtistTier::Headliner,
        ArtistTier::SubHeadliner,
        ArtistTier::MidTier,
        ArtistTier::Undercard,
    ];
}

/// Picks the tier whose current average score is nearest to `artist_score`.
///
/// `lineup` pairs each booked artist's tier with its score. Empty tiers are ignored.
pub fn suggest_tier(lineup: &[(ArtistTier, u32)], artist_score: u32) -> Option<ArtistTier> {
    let mut best: Option<(ArtistTier, f64)> = None;

    for tier in ArtistTier::ALL {
        let scores: Vec<u32> = lineup
            .iter()
            .filter(|(t, _)| *t == tier)
            .map(|&(_, score)| score)
            .collect();
        if scores.is_empty() {
            continue;
        }

        let average = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64;
        let difference = (f64::from(artist_score) - average).abs();
        if best.is_none_or(|(_, min)| difference < min) {
            best = Some((tier, difference));
        }
    }

    best.map(|(tier, _)| tier)
}
