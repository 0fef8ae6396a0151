//! Multi-label dataset container and feature-view construction.
//!
//! A `MultiLabelDataset` holds the covariate matrix and one 0/1 column per
//! label. Chain training reads per-slot feature views from it (covariates
//! plus the label columns visible to that slot) and, when predictions are
//! fed forward, writes each freshly trained slot's training-set predictions
//! back into its label column.
use ndarray::{Array2, Axis};

use crate::error::ChainError;

#[derive(Debug, Clone)]
pub struct MultiLabelDataset {
    x: Array2<f32>,
    labels: Array2<f32>,
    feature_names: Vec<String>,
    label_names: Vec<String>,
}

impl MultiLabelDataset {
    /// Create a dataset from a covariate matrix and a 0/1 label matrix.
    ///
    /// # Arguments
    ///
    /// * `x` - Covariates, shape (n_rows, n_features)
    /// * `labels` - Label matrix, shape (n_rows, n_labels), values in {0, 1}
    /// * `feature_names` - One name per covariate column
    /// * `label_names` - One name per label column
    pub fn new(
        x: Array2<f32>,
        labels: Array2<f32>,
        feature_names: Vec<String>,
        label_names: Vec<String>,
    ) -> Result<Self, ChainError> {
        if x.nrows() == 0 {
            return Err(ChainError::DataSchema("dataset has no rows".to_string()));
        }
        if labels.ncols() == 0 {
            return Err(ChainError::DataSchema("dataset has no labels".to_string()));
        }
        if labels.nrows() != x.nrows() {
            return Err(ChainError::DataSchema(format!(
                "label matrix has {} rows but covariates have {}",
                labels.nrows(),
                x.nrows()
            )));
        }
        if feature_names.len() != x.ncols() {
            return Err(ChainError::DataSchema(format!(
                "{} feature names for {} covariate columns",
                feature_names.len(),
                x.ncols()
            )));
        }
        if label_names.len() != labels.ncols() {
            return Err(ChainError::DataSchema(format!(
                "{} label names for {} label columns",
                label_names.len(),
                labels.ncols()
            )));
        }
        if labels.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(ChainError::DataSchema(
                "label values must be 0 or 1".to_string(),
            ));
        }
        Ok(Self {
            x,
            labels,
            feature_names,
            label_names,
        })
    }

    /// Convenience constructor generating `f{i}` / `label{j}` column names.
    pub fn with_default_names(x: Array2<f32>, labels: Array2<f32>) -> Result<Self, ChainError> {
        let feature_names = (0..x.ncols()).map(|i| format!("f{}", i)).collect();
        let label_names = (0..labels.ncols()).map(|j| format!("label{}", j)).collect();
        Self::new(x, labels, feature_names, label_names)
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_labels(&self) -> usize {
        self.labels.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Row projection used for bootstrap/subsample views. Indices may repeat.
    pub fn resample(&self, indices: &[usize]) -> MultiLabelDataset {
        MultiLabelDataset {
            x: self.x.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
            label_names: self.label_names.clone(),
        }
    }

    /// Build the feature view for one chain slot: every covariate column in
    /// dataset order, followed by the named label columns in the given order.
    ///
    /// The caller is responsible for excluding the slot's own label from
    /// `visible_labels`; that column is the training target, not a feature.
    pub fn slot_features(&self, visible_labels: &[usize]) -> Result<Array2<f32>, ChainError> {
        for &j in visible_labels {
            if j >= self.n_labels() {
                return Err(ChainError::DataSchema(format!(
                    "label index {} out of range for {} labels",
                    j,
                    self.n_labels()
                )));
            }
        }
        let n_rows = self.n_rows();
        let n_cols = self.n_features() + visible_labels.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in 0..n_rows {
            data.extend(self.x.row(row).iter().copied());
            data.extend(visible_labels.iter().map(|&j| self.labels[[row, j]]));
        }
        Array2::from_shape_vec((n_rows, n_cols), data)
            .map_err(|e| ChainError::DataSchema(e.to_string()))
    }

    /// The 0/1 targets for one label column.
    pub fn target(&self, label: usize) -> Vec<u8> {
        self.labels
            .column(label)
            .iter()
            .map(|&v| if v >= 0.5 { 1 } else { 0 })
            .collect()
    }

    /// Overwrite one label value, used to substitute a slot's training-set
    /// prediction for the ground truth.
    pub fn set_label(&mut self, row: usize, label: usize, value: u8) {
        self.labels[[row, label]] = value as f32;
    }
}
