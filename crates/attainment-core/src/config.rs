//! Run configuration: target weights, score blend and expectation threshold.
//!
//! A configuration is supplied once per run and validated as a unit before
//! any input is read. Invalid values are reported, never clamped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of course targets (目标) the report computes.
pub const TARGET_COUNT: usize = 3;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("target weights must sum to 100%, got {0}%")]
    TargetWeightSum(i64),

    #[error("regular/final score weights must sum to 100%, got {0}%")]
    ScoreWeightSum(i64),

    #[error("weights must be non-negative, got {0}%")]
    NegativeWeight(i32),

    #[error("attainment expectation must be within [0, 1], got {0}")]
    ExpectationOutOfRange(f64),
}

/// Blend ratio between continuous assessment and the final exam, in percent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub regular: i32,
    pub final_exam: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            regular: 30,
            final_exam: 70,
        }
    }
}

/// Attainment report configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttainmentConfig {
    /// Weight of each target in percent; must sum to 100
    pub target_weights: [i32; TARGET_COUNT],
    /// Regular/final blend; must sum to 100
    pub score_weights: ScoreWeights,
    /// Minimum acceptable normalized attainment, drawn as a reference line
    pub expectation: f64,
}

impl Default for AttainmentConfig {
    fn default() -> Self {
        Self {
            target_weights: [50, 30, 20],
            score_weights: ScoreWeights::default(),
            expectation: 0.6,
        }
    }
}

impl AttainmentConfig {
    /// Build and validate a configuration in one step.
    pub fn new(
        target_weights: [i32; TARGET_COUNT],
        score_weights: ScoreWeights,
        expectation: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            target_weights,
            score_weights,
            expectation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint, reporting the first one violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Widened: i32 sums of huge weights can wrap back to 100
        let target_sum: i64 = self.target_weights.iter().copied().map(i64::from).sum();
        if target_sum != 100 {
            return Err(ConfigError::TargetWeightSum(target_sum));
        }

        let score_sum =
            i64::from(self.score_weights.regular) + i64::from(self.score_weights.final_exam);
        if score_sum != 100 {
            return Err(ConfigError::ScoreWeightSum(score_sum));
        }

        let all_weights = self
            .target_weights
            .iter()
            .copied()
            .chain([self.score_weights.regular, self.score_weights.final_exam]);
        for weight in all_weights {
            if weight < 0 {
                return Err(ConfigError::NegativeWeight(weight));
            }
        }

        // NaN fails the range check as well
        if !(0.0..=1.0).contains(&self.expectation) {
            return Err(ConfigError::ExpectationOutOfRange(self.expectation));
        }

        Ok(())
    }
}
