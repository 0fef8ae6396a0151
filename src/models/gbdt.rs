use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;

use crate::config::LearnerConfig;
use crate::error::ChainError;
use crate::models::learner::{BaseLearner, SlotModel};

/// Gradient Boosting Decision Tree base learner.
pub struct GbdtLearner {
    max_depth: u32,
    num_boost_round: u32,
    learning_rate: f32,
    loss_type: String,
    training_optimization_level: u8,
    debug: bool,
}

impl GbdtLearner {
    pub fn new(config: &LearnerConfig) -> Result<Self, ChainError> {
        match config {
            LearnerConfig::Gbdt {
                max_depth,
                num_boost_round,
                learning_rate,
                loss_type,
                training_optimization_level,
                debug,
            } => Ok(GbdtLearner {
                max_depth: *max_depth,
                num_boost_round: *num_boost_round,
                learning_rate: *learning_rate,
                loss_type: loss_type.clone(),
                training_optimization_level: *training_optimization_level,
                debug: *debug,
            }),
            other => Err(ChainError::Configuration(format!(
                "expected GBDT learner config, got {:?}",
                other
            ))),
        }
    }

    fn logistic_output(&self) -> bool {
        self.loss_type == "LogLikelyhood"
    }
}

impl BaseLearner for GbdtLearner {
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

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.learning_rate);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.num_boost_round as usize);
        config.set_debug(self.debug);
        config.set_training_optimization_level(self.training_optimization_level);
        config.set_loss(&self.loss_type);

        let logistic = self.logistic_output();
        let mut train_x = DataVec::new();
        for row in 0..x.nrows() {
            let train_row = x.row(row).to_vec();
            // LogLikelyhood trains on {-1, 1}; regression losses on {0, 1}.
            let target = if logistic {
                if y[row] == 1 {
                    1.0
                } else {
                    -1.0
                }
            } else {
                y[row] as f32
            };
            train_x.push(Data::new_training_data(train_row, 1.0, target, None));
        }

        let mut model = GBDT::new(&config);
        model.fit(&mut train_x);

        Ok(Box::new(GbdtModel {
            model,
            n_features: x.ncols(),
            logistic,
        }))
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

struct GbdtModel {
    model: GBDT,
    n_features: usize,
    logistic: bool,
}

impl SlotModel for GbdtModel {
    fn classes(&self) -> [u8; 2] {
        [0, 1]
    }

    fn distribution(&self, features: &[f32]) -> Result<[f32; 2], ChainError> {
        if features.len() != self.n_features {
            return Err(ChainError::DataSchema(format!(
                "gbdt model trained on {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        let test_x = vec![Data::new_test_data(features.to_vec(), None)];
        let raw = self.model.predict(&test_x)[0];
        let p = if self.logistic {
            1.0 / (1.0 + (-2.0 * raw).exp())
        } else {
            raw.clamp(0.0, 1.0)
        };
        Ok([1.0 - p, p])
    }
}
