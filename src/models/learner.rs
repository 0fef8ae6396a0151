use ndarray::Array2;

use crate::error::ChainError;

/// The base-learner capability consumed by the chain schedulers.
///
/// Implementations are stateless factories: `fit` builds a fresh model from
/// scratch on every call, so one learner can be shared (via `Arc`) across
/// concurrently training slots the way the original prototype-classifier
/// contract requires.
pub trait BaseLearner: Send + Sync {
    /// Fit a model on `x` with 0/1 targets `y` (one entry per row).
    fn fit(&self, x: &Array2<f32>, y: &[u8]) -> Result<Box<dyn SlotModel>, ChainError>;

    /// Human readable name, used in error reports.
    fn name(&self) -> &str {
        "learner"
    }
}

/// A trained model for one chain slot, bound to the exact feature-view
/// shape used at training time.
pub trait SlotModel: Send + Sync {
    /// The two class values in the order `distribution` reports them.
    /// Implementations may report them in either order.
    fn classes(&self) -> [u8; 2];

    /// Class distribution for one feature vector, aligned with `classes`.
    fn distribution(&self, features: &[f32]) -> Result<[f32; 2], ChainError>;
}
