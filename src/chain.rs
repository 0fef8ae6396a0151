//! Chain building: per-slot training and the chain-level scheduler.
//!
//! A chain is an ordered permutation of the label set. Slot *i* trains a
//! binary classifier for label `chain[i]` on a feature view containing the
//! covariates plus every label column already marked trained in the shared
//! registry. With `use_predictions` enabled, the slot then overwrites its
//! label column with the model's training-set predictions, which is what
//! later slots see instead of the ground truth.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;

use crate::dataset::MultiLabelDataset;
use crate::error::ChainError;
use crate::models::learner::{BaseLearner, SlotModel};
use crate::registry::TrainedLabelRegistry;
use crate::sampling::random_chain;

/// One trained chain position: the label it predicts, the label columns its
/// feature view contained (in ascending label order), and the fitted model.
/// The visible set is recorded so inference can reproduce the exact
/// attribute layout the model was trained on.
pub struct ChainSlot {
    pub label: usize,
    pub visible_labels: Vec<usize>,
    pub model: Box<dyn SlotModel>,
}

/// A fully built chain: one slot per chain position.
pub struct ChainMember {
    pub chain: Vec<usize>,
    pub slots: Vec<ChainSlot>,
    pub elapsed: Duration,
}

/// Builds one full chain, sequentially or on a bounded worker pool.
pub struct ChainScheduler {
    learner: Arc<dyn BaseLearner>,
    use_predictions: bool,
    concurrency: usize,
}

impl ChainScheduler {
    /// # Arguments
    ///
    /// * `learner` - Shared base-learner prototype; each slot fits a fresh model
    /// * `use_predictions` - Feed training-set predictions forward to later slots
    /// * `concurrency` - Worker pool size; 1 is sequential
    pub fn new(learner: Arc<dyn BaseLearner>, use_predictions: bool, concurrency: usize) -> Self {
        Self {
            learner,
            use_predictions,
            concurrency,
        }
    }

    /// Build every slot of one chain over `dataset`.
    ///
    /// When `chain` is absent a random permutation is drawn from `rng`.
    /// Slots are always dispatched in chain order: each slot starts only
    /// after its predecessor finished, so the feature view it trains on
    /// contains exactly the labels earlier in the chain. With
    /// `concurrency > 1` the slot work itself runs on a bounded pool,
    /// which parallelizes the per-row training-set predictions inside
    /// each slot.
    ///
    /// A slot failure does not abort the remaining slots; later slots
    /// simply treat the failed label as untrained. All failures are
    /// aggregated and raised once every slot has finished.
    pub fn build<R: Rng>(
        &self,
        dataset: &mut MultiLabelDataset,
        chain: Option<Vec<usize>>,
        rng: &mut R,
    ) -> Result<ChainMember, ChainError> {
        let start = Instant::now();
        let n_labels = dataset.n_labels();

        let chain = match chain {
            Some(chain) => {
                validate_chain(&chain, n_labels)?;
                chain
            }
            None => random_chain(n_labels, rng),
        };

        let registry = TrainedLabelRegistry::new(n_labels);
        let concurrency = self.concurrency;

        let mut slots: Vec<ChainSlot> = Vec::with_capacity(n_labels);
        let mut failures: Vec<ChainError> = Vec::new();

        if concurrency <= 1 {
            for (pos, &label) in chain.iter().enumerate() {
                log::debug!("building model {}/{} for label {}", pos + 1, n_labels, label);
                match train_slot(
                    dataset,
                    label,
                    &registry,
                    self.learner.as_ref(),
                    self.use_predictions,
                    false,
                ) {
                    Ok(slot) => slots.push(slot),
                    Err(e) => failures.push(e),
                }
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(concurrency)
                .build()?;
            for (pos, &label) in chain.iter().enumerate() {
                log::debug!("building model {}/{} for label {}", pos + 1, n_labels, label);
                let result = pool.install(|| {
                    train_slot(
                        &mut *dataset,
                        label,
                        &registry,
                        self.learner.as_ref(),
                        self.use_predictions,
                        true,
                    )
                });
                match result {
                    Ok(slot) => slots.push(slot),
                    Err(e) => failures.push(e),
                }
            }
        }

        if !failures.is_empty() {
            return Err(ChainError::Build { failures });
        }

        debug_assert!(registry.all_trained());
        Ok(ChainMember {
            chain,
            slots,
            elapsed: start.elapsed(),
        })
    }
}

fn validate_chain(chain: &[usize], n_labels: usize) -> Result<(), ChainError> {
    let unique: HashSet<usize> = chain.iter().copied().collect();
    if chain.len() != n_labels || unique.len() != n_labels || chain.iter().any(|&l| l >= n_labels)
    {
        return Err(ChainError::Configuration(format!(
            "chain {:?} is not a permutation of 0..{}",
            chain, n_labels
        )));
    }
    Ok(())
}

/// Train one chain slot. The atomic unit of scheduled work.
///
/// The registry snapshot and the final mark go through the registry's
/// mutex; the expensive regions (fitting, per-row prediction) run
/// unlocked.
fn train_slot(
    dataset: &mut MultiLabelDataset,
    label: usize,
    registry: &TrainedLabelRegistry,
    learner: &dyn BaseLearner,
    use_predictions: bool,
    parallel_rows: bool,
) -> Result<ChainSlot, ChainError> {
    let snapshot = registry.snapshot_trained();
    let visible_labels: Vec<usize> = (0..dataset.n_labels())
        .filter(|&j| j != label && snapshot[j])
        .collect();

    let x = dataset.slot_features(&visible_labels)?;
    let y = dataset.target(label);

    let model = learner.fit(&x, &y).map_err(|e| ChainError::Learner {
        learner: learner.name().to_string(),
        label,
        message: e.to_string(),
    })?;

    if use_predictions {
        let decisions = predict_training_rows(&x, model.as_ref(), parallel_rows).map_err(|e| {
            ChainError::Learner {
                learner: learner.name().to_string(),
                label,
                message: e.to_string(),
            }
        })?;
        for (row, &decision) in decisions.iter().enumerate() {
            dataset.set_label(row, label, decision);
        }
    }

    registry.mark_trained(label);

    Ok(ChainSlot {
        label,
        visible_labels,
        model,
    })
}

/// Predict the 0/1 decision for every training row of a slot's own view.
fn predict_training_rows(
    x: &ndarray::Array2<f32>,
    model: &dyn SlotModel,
    parallel: bool,
) -> Result<Vec<u8>, ChainError> {
    let decide = |row: usize| -> Result<u8, ChainError> {
        let features = x.row(row).to_vec();
        let dist = model.distribution(&features)?;
        let max_idx = if dist[0] > dist[1] { 0 } else { 1 };
        Ok(if model.classes()[max_idx] == 1 { 1 } else { 0 })
    };
    if parallel {
        (0..x.nrows()).into_par_iter().map(decide).collect()
    } else {
        (0..x.nrows()).map(decide).collect()
    }
}
