use ndarray::Array2;

use crate::error::ChainError;
use crate::models::learner::{BaseLearner, SlotModel};

/// Nearest-centroid classifier.
///
/// Fully deterministic given its input, which makes it the reference
/// learner for the reproducibility tests. Class values are reported in
/// order of first appearance in the targets, so downstream code cannot
/// assume a fixed {0, 1} ordering.
pub struct CentroidLearner;

struct CentroidModel {
    classes: [u8; 2],
    // Aligned with `classes`; None when the class was absent from training.
    centroids: [Option<Vec<f32>>; 2],
    n_features: usize,
}

impl BaseLearner for CentroidLearner {
    fn fit(&self, x: &Array2<f32>, y: &[u8]) -> Result<Box<dyn SlotModel>, ChainError> {
        if x.nrows() == 0 {
            return Err(ChainError::DataSchema(
                "cannot fit on an empty matrix".to_string(),
            ));
        }
        if y.len() != x.nrows() {
            return Err(ChainError::DataSchema(format!(
                "{} targets for {} rows",
                y.len(),
                x.nrows()
            )));
        }

        let first = y[0];
        let second = 1 - first;
        let classes = [first, second];

        let centroids = [mean_of_class(x, y, first), mean_of_class(x, y, second)];

        Ok(Box::new(CentroidModel {
            classes,
            centroids,
            n_features: x.ncols(),
        }))
    }

    fn name(&self) -> &str {
        "centroid"
    }
}

fn mean_of_class(x: &Array2<f32>, y: &[u8], class: u8) -> Option<Vec<f32>> {
    let rows: Vec<usize> = (0..x.nrows()).filter(|&i| y[i] == class).collect();
    if rows.is_empty() {
        return None;
    }
    let mut mean = vec![0.0f32; x.ncols()];
    for &row in &rows {
        for (acc, &v) in mean.iter_mut().zip(x.row(row).iter()) {
            *acc += v;
        }
    }
    for v in mean.iter_mut() {
        *v /= rows.len() as f32;
    }
    Some(mean)
}

impl SlotModel for CentroidModel {
    fn classes(&self) -> [u8; 2] {
        self.classes
    }

    fn distribution(&self, features: &[f32]) -> Result<[f32; 2], ChainError> {
        if features.len() != self.n_features {
            return Err(ChainError::DataSchema(format!(
                "centroid model trained on {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        let weights = self.centroids.clone().map(|centroid| match centroid {
            Some(c) => {
                let d2: f32 = c
                    .iter()
                    .zip(features.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                1.0 / (d2 + 1e-6)
            }
            None => 0.0,
        });
        let total = weights[0] + weights[1];
        Ok([weights[0] / total, weights[1] / total])
    }
}
