use thiserror::Error;

/// Error taxonomy for ensemble training and inference.
///
/// `Configuration` and `DataSchema` are fatal and abort the enclosing build;
/// `Learner` failures are captured per training task and aggregated into
/// `Build` once every sibling task has finished.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("data schema error: {0}")]
    DataSchema(String),

    #[error("base learner '{learner}' failed on label {label}: {message}")]
    Learner {
        learner: String,
        label: usize,
        message: String,
    },

    #[error("ensemble build failed with {} underlying error(s)", .failures.len())]
    Build { failures: Vec<ChainError> },

    #[error("worker pool construction failed: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
