//! Killer/victim compatibility scoring
//!
//! Score formula, clamped to [0, 1]:
//!
//! ```text
//! quality = rating_similarity      # 1 at equal rating, 0 at max_rating_diff
//!         + course_bonus           # course_coefficient if same course
//!         + group_bonus            # group_coefficient if same group
//!         + type_bonus             # type_coefficient if same academic type
//!         + time_bonus             # time_coefficient * combined wait seconds
//! ```
//!
//! A rating gap above `max_rating_diff` is a hard cutoff: the pair scores
//! exactly zero whatever the other terms would add.

use crate::config::ScoringConfig;
use crate::error::{MatchmakingError, Result};
use crate::types::QueueEntry;
use crate::utils::rating_difference;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Trait for rating a candidate pair
pub trait PairScorer: Send + Sync {
    /// Rate `killer` hunting `victim` at `now`, in [0, 1]
    fn rate_pair(&self, killer: &QueueEntry, victim: &QueueEntry, now: DateTime<Utc>)
        -> Result<f64>;
}

/// Individual terms of a score, for logging and inspection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub rating_similarity: f64,
    pub course_bonus: f64,
    pub group_bonus: f64,
    pub type_bonus: f64,
    pub time_bonus: f64,
    /// Final clamped quality
    pub quality: f64,
}

impl ScoreBreakdown {
    fn cutoff() -> Self {
        Self {
            rating_similarity: 0.0,
            course_bonus: 0.0,
            group_bonus: 0.0,
            type_bonus: 0.0,
            time_bonus: 0.0,
            quality: 0.0,
        }
    }
}

/// The configured multi-factor compatibility function
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    config: ScoringConfig,
}

impl CompatibilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Match quality of the pair in [0, 1]
    pub fn score(&self, killer: &QueueEntry, victim: &QueueEntry, now: DateTime<Utc>) -> f64 {
        self.breakdown(killer, victim, now).quality
    }

    /// Compute every term of the score
    pub fn breakdown(
        &self,
        killer: &QueueEntry,
        victim: &QueueEntry,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let config = &self.config;

        let rating_diff = rating_difference(killer.rating(), victim.rating());
        if rating_diff > config.max_rating_diff {
            return ScoreBreakdown::cutoff();
        }

        let rating_similarity = 1.0 - (rating_diff / config.max_rating_diff).min(1.0);

        let (k, v) = (killer.data(), victim.data());
        let course_bonus = if k.course_number() == v.course_number() {
            config.course_coefficient
        } else {
            0.0
        };
        let group_bonus = if k.group_name() == v.group_name() {
            config.group_coefficient
        } else {
            0.0
        };
        let type_bonus = if k.player_type() == v.player_type() {
            config.type_coefficient
        } else {
            0.0
        };
        let time_bonus =
            config.time_coefficient * (killer.wait_seconds(now) + victim.wait_seconds(now));

        let raw = rating_similarity + course_bonus + group_bonus + type_bonus + time_bonus;

        ScoreBreakdown {
            rating_similarity,
            course_bonus,
            group_bonus,
            type_bonus,
            time_bonus,
            quality: raw.clamp(0.0, 1.0),
        }
    }
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl PairScorer for CompatibilityScorer {
    fn rate_pair(
        &self,
        killer: &QueueEntry,
        victim: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let quality = self.score(killer, victim, now);
        if quality.is_nan() {
            return Err(MatchmakingError::InternalError {
                message: format!(
                    "score for {} -> {} is not a number",
                    killer.id(),
                    victim.id()
                ),
            });
        }
        Ok(quality)
    }
}
