//! Shared "which labels are trained" state for one chain build.
use std::sync::Mutex;

/// The single point of shared mutable state during a chain build.
///
/// Every slot snapshots the trained flags to decide which label columns its
/// feature view may contain, and marks its own label once its model is fit.
/// Both operations go through one mutex; raw access to the flags is never
/// exposed. The lock is held only for these two short critical sections,
/// never across model fitting or prediction.
#[derive(Debug)]
pub struct TrainedLabelRegistry {
    trained: Mutex<Vec<bool>>,
}

impl TrainedLabelRegistry {
    pub fn new(n_labels: usize) -> Self {
        Self {
            trained: Mutex::new(vec![false; n_labels]),
        }
    }

    /// Flip one label's flag to trained. Idempotent.
    pub fn mark_trained(&self, label: usize) {
        let mut trained = self.trained.lock().expect("trained registry poisoned");
        trained[label] = true;
    }

    /// A consistent copy of the trained flags.
    pub fn snapshot_trained(&self) -> Vec<bool> {
        self.trained.lock().expect("trained registry poisoned").clone()
    }

    pub fn all_trained(&self) -> bool {
        self.snapshot_trained().iter().all(|&t| t)
    }
}
