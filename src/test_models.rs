// src/test_models.rs

//! Small closed-form models used by the unit tests.

use crate::config::{FeatureConfig, FeatureMetadata, ModelConfig, TrainingSetMetadata};
use crate::core::{Dataset, ExplainError, Result};
use crate::traits::PredictModel;
use ndarray::{Array1, Array2, Axis};

enum Link {
    Identity,
    Sigmoid,
    Softmax,
}

/// Linear scores `X · Wᵀ + b` passed through a link chosen by the target type.
///
/// Input features are named `x0..x{n-1}`. Besides its target, the config
/// declares a `caption` text output that cannot be explained.
pub(crate) struct TestModel {
    config: ModelConfig,
    metadata: TrainingSetMetadata,
    weights: Array2<f64>,
    bias: Array1<f64>,
    link: Link,
    target: String,
}

impl TestModel {
    fn build(target: &str, target_type: &str, weights: Array2<f64>, bias: Array1<f64>, link: Link) -> Self {
        let config = ModelConfig {
            input_features: (0..weights.ncols())
                .map(|i| FeatureConfig::new(format!("x{}", i), "number"))
                .collect(),
            output_features: vec![
                FeatureConfig::new(target, target_type),
                FeatureConfig::new("caption", "text"),
            ],
        };
        let mut metadata = TrainingSetMetadata::default();
        if target_type == crate::config::CATEGORY {
            metadata.insert(target, FeatureMetadata { vocab_size: Some(weights.nrows()) });
        }
        TestModel {
            config,
            metadata,
            weights,
            bias,
            link,
            target: target.to_string(),
        }
    }

    /// `price = coefs · x + bias`
    pub fn number(coefs: Array1<f64>, bias: f64) -> Self {
        let weights = coefs.insert_axis(Axis(0));
        Self::build("price", "number", weights, Array1::from_elem(1, bias), Link::Identity)
    }

    /// `P(churn) = sigmoid(coefs · x + bias)`
    pub fn binary(coefs: Array1<f64>, bias: f64) -> Self {
        let weights = coefs.insert_axis(Axis(0));
        Self::build("churn", "binary", weights, Array1::from_elem(1, bias), Link::Sigmoid)
    }

    /// `P(segment) = softmax(W · x)` with one weight row per class.
    pub fn category(weights: Array2<f64>) -> Self {
        let bias = Array1::zeros(weights.nrows());
        Self::build("segment", "category", weights, bias, Link::Softmax)
    }
}

impl PredictModel for TestModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn training_set_metadata(&self) -> &TrainingSetMetadata {
        &self.metadata
    }

    fn predict(&self, instances: &Dataset, target: &str) -> Result<Dataset> {
        if target != self.target {
            return Err(ExplainError::ModelPredictionError(format!("Cannot predict '{}'.", target)));
        }
        if instances.ncols() != self.weights.ncols() {
            return Err(ExplainError::IncompatibleDimensions(format!(
                "Model expects {} features, got {}",
                self.weights.ncols(),
                instances.ncols()
            )));
        }
        let scores = instances.dot(&self.weights.t()) + &self.bias;
        Ok(match self.link {
            Link::Identity => scores,
            Link::Sigmoid => {
                let p = scores.column(0).mapv(|s| 1.0 / (1.0 + (-s).exp()));
                let mut out = Dataset::zeros((instances.nrows(), 2));
                out.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
                out.column_mut(1).assign(&p);
                out
            }
            Link::Softmax => {
                let mut out = scores.mapv(f64::exp);
                for mut row in out.rows_mut() {
                    let total = row.sum();
                    row /= total;
                }
                out
            }
        })
    }
}
