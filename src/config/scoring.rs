//! Compatibility scoring configuration

use serde::{Deserialize, Serialize};

/// Coefficients of the killer/victim compatibility function.
///
/// The signs are game-design tuning: a shared course is rewarded, a shared
/// group or academic type is penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Rating gap above which a pair scores exactly zero
    pub max_rating_diff: f64,
    /// Added when both players share a course number
    pub course_coefficient: f64,
    /// Added when both players share a group name
    pub group_coefficient: f64,
    /// Added when both players share an academic type
    pub type_coefficient: f64,
    /// Added per second of combined waiting time
    pub time_coefficient: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_rating_diff: 1000.0,
            course_coefficient: 0.3,
            group_coefficient: -0.2,
            type_coefficient: -0.6,
            time_coefficient: 0.001,
        }
    }
}

impl ScoringConfig {
    /// Rating similarity only, every bonus disabled
    pub fn rating_only(max_rating_diff: f64) -> Self {
        Self {
            max_rating_diff,
            course_coefficient: 0.0,
            group_coefficient: 0.0,
            type_coefficient: 0.0,
            time_coefficient: 0.0,
        }
    }

    /// Validate coefficient values
    pub fn validate(&self) -> crate::error::Result<()> {
        let all = [
            self.max_rating_diff,
            self.course_coefficient,
            self.group_coefficient,
            self.type_coefficient,
            self.time_coefficient,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: "scoring coefficients must be finite numbers".to_string(),
            });
        }

        if self.max_rating_diff <= 0.0 {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: "max_rating_diff must be positive".to_string(),
            });
        }

        if self.time_coefficient < 0.0 {
            return Err(crate::error::MatchmakingError::ConfigurationError {
                message: "time_coefficient must be non-negative".to_string(),
            });
        }

        Ok(())
    }
}
