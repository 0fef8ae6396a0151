//! Ensemble building and the trained-ensemble inference entrypoint.
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::chain::{ChainMember, ChainScheduler};
use crate::config::{Aggregation, EnsembleConfig, SamplingMode, TieBreak};
use crate::dataset::MultiLabelDataset;
use crate::error::ChainError;
use crate::models::factory::build_learner;
use crate::models::learner::BaseLearner;
use crate::predict::{combine, predict_member, MultiLabelOutput};
use crate::sampling::{bootstrap_indices, member_rng, subsample_indices};

/// Builds K chains, each on an independently resampled view of the training
/// set with its own random label order, sequentially or on a worker pool.
pub struct EnsembleScheduler {
    config: EnsembleConfig,
    learner: Arc<dyn BaseLearner>,
}

impl EnsembleScheduler {
    /// Create a scheduler using one of the built-in base learners named in
    /// the configuration. Fails eagerly on an invalid configuration.
    pub fn new(config: EnsembleConfig) -> Result<Self, ChainError> {
        config.validate()?;
        let learner = build_learner(&config.learner)?;
        Ok(Self { config, learner })
    }

    /// Create a scheduler with an externally supplied base learner.
    pub fn with_learner(
        config: EnsembleConfig,
        learner: Arc<dyn BaseLearner>,
    ) -> Result<Self, ChainError> {
        config.validate()?;
        Ok(Self { config, learner })
    }

    /// Build the ensemble, drawing every member's chain at random.
    pub fn build(&self, dataset: &MultiLabelDataset) -> Result<TrainedEnsemble, ChainError> {
        self.build_with_chains(dataset, None)
    }

    /// Build the ensemble with explicit per-member chains (one per member).
    ///
    /// Each member derives its own generator from `(seed, member_index)`,
    /// draws its resampled view and then, when no explicit chain was given,
    /// its chain permutation. The generator streams are a pure function of
    /// the seed, so a fixed seed produces the same bags and chains at every
    /// concurrency level.
    ///
    /// Member failures do not stop sibling members; once all have finished,
    /// any failures are aggregated into a single error and every partially
    /// built member is discarded.
    pub fn build_with_chains(
        &self,
        dataset: &MultiLabelDataset,
        chains: Option<&[Vec<usize>]>,
    ) -> Result<TrainedEnsemble, ChainError> {
        let num_members = self.config.num_members;
        if let Some(chains) = chains {
            if chains.len() != num_members {
                return Err(ChainError::Configuration(format!(
                    "{} explicit chains for {} members",
                    chains.len(),
                    num_members
                )));
            }
        }

        let start = Instant::now();
        let build_member = |member: usize| -> Result<ChainMember, ChainError> {
            let mut rng = member_rng(self.config.seed, member);
            let indices = match self.config.sampling {
                SamplingMode::WithReplacement { bag_size_percent } => {
                    bootstrap_indices(dataset.n_rows(), bag_size_percent, &mut rng)
                }
                SamplingMode::Subsample { percentage } => {
                    subsample_indices(dataset.n_rows(), percentage, &mut rng)
                }
            };
            let mut view = dataset.resample(&indices);
            log::info!(
                "building ensemble member {}/{} on {} rows",
                member + 1,
                num_members,
                view.n_rows()
            );

            let chain = chains.map(|c| c[member].clone());
            let scheduler = ChainScheduler::new(
                Arc::clone(&self.learner),
                self.config.use_predictions,
                self.config.resolved_chain_concurrency(),
            );
            scheduler.build(&mut view, chain, &mut rng)
        };

        let results: Vec<Result<ChainMember, ChainError>> =
            if self.config.resolved_ensemble_concurrency() <= 1 {
                (0..num_members).map(build_member).collect()
            } else {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.resolved_ensemble_concurrency())
                    .build()?;
                pool.install(|| (0..num_members).into_par_iter().map(build_member).collect())
            };

        let mut members = Vec::with_capacity(num_members);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(member) => members.push(member),
                Err(e) => failures.push(e),
            }
        }
        if !failures.is_empty() {
            return Err(ChainError::Build { failures });
        }

        let build_time = start.elapsed();
        log::info!(
            "built {} ensemble members in {:?}",
            members.len(),
            build_time
        );
        Ok(TrainedEnsemble {
            members,
            aggregation: self.config.aggregation,
            threshold: self.config.threshold,
            tie_break: self.config.tie_break,
            n_features: dataset.n_features(),
            n_labels: dataset.n_labels(),
            build_time,
        })
    }
}

/// A trained ensemble of classifier chains. Outlives the training call and
/// is queried repeatedly for inference.
pub struct TrainedEnsemble {
    pub members: Vec<ChainMember>,
    pub aggregation: Aggregation,
    pub threshold: f32,
    pub tie_break: TieBreak,
    pub n_features: usize,
    pub n_labels: usize,
    pub build_time: Duration,
}

impl TrainedEnsemble {
    /// Predict the label set for one row of covariates.
    ///
    /// Fails fast if the row does not match the schema recorded at
    /// training time.
    pub fn predict(&self, row: &[f32]) -> Result<MultiLabelOutput, ChainError> {
        if row.len() != self.n_features {
            return Err(ChainError::DataSchema(format!(
                "ensemble trained on {} features, got a row with {}",
                self.n_features,
                row.len()
            )));
        }
        let outputs: Vec<MultiLabelOutput> = self
            .members
            .iter()
            .map(|member| predict_member(member, row))
            .collect::<Result<_, _>>()?;
        Ok(combine(
            &outputs,
            self.aggregation,
            self.threshold,
            self.tie_break,
        ))
    }
}
