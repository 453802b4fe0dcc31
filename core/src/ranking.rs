use crate::channel::ChannelCandidate;

/// Scores closer than this are treated as equal.
const TIE_EPSILON: f64 = 0.01;
/// Relative subscriber difference under which two channels count as similar.
const SIMILAR_COUNT_RATIO: f64 = 0.10;
/// A replacement with videos must reach this share of the original's subscribers.
const MIN_REPLACEMENT_RATIO: f64 = 0.10;

/// Configuration for channel ranking
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Channels below this subscriber count score 0
    pub minimum_subscribers: u64,
    pub verified_bonus_percent: f64,
    pub activity_bonus_percent: f64,
    pub official_bonus_percent: f64,
}

impl RankingConfig {
    pub fn new(
        minimum_subscribers: u64,
        verified_bonus_percent: f64,
        activity_bonus_percent: f64,
        official_bonus_percent: f64,
    ) -> Self {
        Self {
            minimum_subscribers,
            verified_bonus_percent,
            activity_bonus_percent,
            official_bonus_percent,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            minimum_subscribers: 1000,
            verified_bonus_percent: 20.0,
            activity_bonus_percent: 10.0,
            official_bonus_percent: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelRanker {
    config: RankingConfig,
}

impl ChannelRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn score(&self, candidate: &ChannelCandidate) -> f64 {
        if candidate.subscriber_count < self.config.minimum_subscribers {
            return 0.0;
        }

        let mut score = candidate.subscriber_count as f64;

        if candidate.is_verified {
            score *= 1.0 + self.config.verified_bonus_percent / 100.0;
        }
        if candidate.has_recent_activity || candidate.has_active_content() {
            score *= 1.0 + self.config.activity_bonus_percent / 100.0;
        }
        if candidate.title_lowercase().contains("official") {
            score *= 1.0 + self.config.official_bonus_percent / 100.0;
        }

        score
    }

    /// Orders candidates best first, dropping those below the subscriber threshold.
    ///
    /// Near-equal scores put the verified channel first; anything else keeps input order.
    pub fn rank(&self, candidates: &[ChannelCandidate]) -> Vec<ChannelCandidate> {
        let mut ranked: Vec<(f64, &ChannelCandidate)> = Vec::with_capacity(candidates.len());

        // Stable insertion: an item only moves ahead of entries it strictly precedes
        for candidate in candidates {
            let score = self.score(candidate);
            if score <= 0.0 {
                continue;
            }
            let mut position = ranked.len();
            while position > 0 && precedes((score, candidate), ranked[position - 1]) {
                position -= 1;
            }
            ranked.insert(position, (score, candidate));
        }

        ranked.into_iter().map(|(_, candidate)| candidate.clone()).collect()
    }

    pub fn select_best(&self, candidates: &[ChannelCandidate]) -> Option<ChannelCandidate> {
        self.rank(candidates).into_iter().next()
    }

    pub fn have_similar_counts(&self, a: &ChannelCandidate, b: &ChannelCandidate) -> bool {
        if a.subscriber_count == 0 && b.subscriber_count == 0 {
            return true;
        }
        let larger = a.subscriber_count.max(b.subscriber_count).max(1) as f64;
        let difference = a.subscriber_count.abs_diff(b.subscriber_count) as f64;
        difference / larger <= SIMILAR_COUNT_RATIO
    }

    pub fn break_tie<'a>(&self, a: &'a ChannelCandidate, b: &'a ChannelCandidate) -> &'a ChannelCandidate {
        if self.have_similar_counts(a, b) && a.is_verified != b.is_verified {
            return if a.is_verified { a } else { b };
        }
        if b.subscriber_count > a.subscriber_count { b } else { a }
    }

    /// Whether `candidate` may replace `original` as an artist's channel.
    pub fn is_valid_replacement(&self, candidate: &ChannelCandidate, original: Option<&ChannelCandidate>) -> bool {
        if candidate.subscriber_count < self.config.minimum_subscribers {
            return false;
        }
        let Some(original) = original else {
            return true;
        };

        let minimum = original.subscriber_count as f64 * MIN_REPLACEMENT_RATIO;
        let real_channel = candidate.has_active_content() && candidate.subscriber_count as f64 >= minimum;

        real_channel || candidate.subscriber_count > original.subscriber_count
    }
}

fn precedes(a: (f64, &ChannelCandidate), b: (f64, &ChannelCandidate)) -> bool {
    if (a.0 - b.0).abs() < TIE_EPSILON {
        a.1.is_verified && !b.1.is_verified
    } else {
        a.0 > b.0
    }
}
