// src/traits.rs
use crate::config::{ModelConfig, TrainingSetMetadata};
use crate::core::{Dataset, Explanation, Result};

/// A trained model that explainers can query.
pub trait PredictModel {
    /// Feature configuration the model was trained with.
    fn config(&self) -> &ModelConfig;

    /// Metadata computed on the training set (vocabularies and the like).
    fn training_set_metadata(&self) -> &TrainingSetMetadata;

    /// Predicts `target` for every row of `instances`.
    ///
    /// Columns of `instances` follow the order of the config's input features.
    /// The result has shape `[rows, labels]`: class probabilities for binary
    /// (`[P(false), P(true)]`) and category targets, the value itself for numbers.
    fn predict(&self, instances: &Dataset, target: &str) -> Result<Dataset>;
}

/// An attribution strategy.
///
/// `explain` consumes the explainer: each instance answers exactly one request.
pub trait Explainer: Sized {
    /// Returns `(explanations, expected_values)`.
    ///
    /// `explanations` holds one entry per input row, or a single aggregated one
    /// in global mode; each carries the feature attributions for every label of
    /// the target. `expected_values` holds the baseline per label, in the same
    /// label order.
    fn explain(self) -> Result<(Vec<Explanation>, Vec<f64>)>;
}
