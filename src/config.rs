use std::str::FromStr;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// How each ensemble member resamples the training set before building
/// its chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Bootstrap with replacement, sized to a percentage of the training set.
    WithReplacement { bag_size_percent: u32 },
    /// Percentage subsample without replacement.
    Subsample { percentage: f64 },
}

/// Whether the ensemble output is the average of binary votes or of
/// per-member confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Vote,
    Confidence,
}

/// Decision policy when the aggregated confidence lands exactly on the
/// threshold. `Exclude` rounds ties down (the label is not assigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    Exclude,
    Include,
}

/// Built-in base learners and their hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LearnerConfig {
    Centroid,
    Gbdt {
        max_depth: u32,
        num_boost_round: u32,
        learning_rate: f32,
        loss_type: String,
        training_optimization_level: u8,
        debug: bool,
    },
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig::Gbdt {
            max_depth: 6,
            num_boost_round: 50,
            learning_rate: 0.1,
            loss_type: "SquaredError".to_string(),
            training_optimization_level: 2,
            debug: false,
        }
    }
}

impl FromStr for LearnerConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "centroid" => Ok(LearnerConfig::Centroid),
            "gbdt" => Ok(LearnerConfig::default()),
            _ => Err(format!("Unknown learner type: {}", s)),
        }
    }
}

/// Central configuration for an ensemble build.
///
/// A concurrency level of `None` means "all available hardware threads",
/// resolved at call time; an explicit level must be at least 1. When both
/// levels are above 1 their product should not oversubscribe the machine;
/// sizing the two pools is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub learner: LearnerConfig,
    pub num_members: usize,
    pub sampling: SamplingMode,
    /// Feed each slot's training-set predictions forward to later slots in
    /// the chain, instead of the ground-truth label values.
    pub use_predictions: bool,
    pub aggregation: Aggregation,
    pub threshold: f32,
    pub tie_break: TieBreak,
    pub chain_concurrency: Option<usize>,
    pub ensemble_concurrency: Option<usize>,
    pub seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            num_members: 10,
            sampling: SamplingMode::WithReplacement {
                bag_size_percent: 100,
            },
            use_predictions: true,
            aggregation: Aggregation::Confidence,
            threshold: 0.5,
            tie_break: TieBreak::Exclude,
            chain_concurrency: Some(1),
            ensemble_concurrency: None,
            seed: 1,
        }
    }
}

impl EnsembleConfig {
    /// Check the configuration eagerly, before any work is scheduled.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.num_members == 0 {
            return Err(ChainError::Configuration(
                "num_members must be at least 1".to_string(),
            ));
        }
        match self.sampling {
            SamplingMode::WithReplacement { bag_size_percent } => {
                if bag_size_percent == 0 || bag_size_percent > 100 {
                    return Err(ChainError::Configuration(format!(
                        "bag_size_percent must be in 1..=100, got {}",
                        bag_size_percent
                    )));
                }
            }
            SamplingMode::Subsample { percentage } => {
                if !(percentage > 0.0 && percentage <= 100.0) {
                    return Err(ChainError::Configuration(format!(
                        "sampling percentage must be in (0, 100], got {}",
                        percentage
                    )));
                }
            }
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ChainError::Configuration(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }
        if self.chain_concurrency == Some(0) {
            return Err(ChainError::Configuration(
                "chain_concurrency must be at least 1 (or None for all threads)".to_string(),
            ));
        }
        if self.ensemble_concurrency == Some(0) {
            return Err(ChainError::Configuration(
                "ensemble_concurrency must be at least 1 (or None for all threads)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolved_chain_concurrency(&self) -> usize {
        resolve_concurrency(self.chain_concurrency)
    }

    pub fn resolved_ensemble_concurrency(&self) -> usize {
        resolve_concurrency(self.ensemble_concurrency)
    }
}

/// Resolve a configured concurrency level, where `None` means all available
/// hardware threads.
pub fn resolve_concurrency(level: Option<usize>) -> usize {
    match level {
        Some(n) => n,
        None => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    }
}
