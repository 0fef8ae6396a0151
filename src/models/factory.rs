use std::sync::Arc;

use crate::config::LearnerConfig;
use crate::error::ChainError;
use crate::models::centroid::CentroidLearner;
use crate::models::gbdt::GbdtLearner;
use crate::models::learner::BaseLearner;

/// Build a shared base learner from a `LearnerConfig`.
/// Currently this is a thin factory implemented as a single function.
pub fn build_learner(config: &LearnerConfig) -> Result<Arc<dyn BaseLearner>, ChainError> {
    match config {
        LearnerConfig::Centroid => Ok(Arc::new(CentroidLearner)),
        LearnerConfig::Gbdt { .. } => Ok(Arc::new(GbdtLearner::new(config)?)),
    }
}
