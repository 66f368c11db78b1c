// src/explainer.rs

//! State shared by every attribution strategy.

use crate::config::{OutputFeature, TargetKind};
use crate::core::{Dataset, ExplainError, Explanation, Frame, Result};
use crate::traits::PredictModel;
use crate::utils::prepare_data;
use log::debug;
use ndarray::{Array2, Axis};
use std::collections::HashMap;

/// Prepared rows, resolved target and explanation placeholders for one request.
///
/// Concrete explainers compose this and implement [`crate::Explainer`] on top of it.
#[derive(Debug)]
pub struct ExplainerBase<'a, M: PredictModel> {
    model: &'a M,
    inputs: Frame,
    sample: Frame,
    feature_cols: Vec<String>,
    target_feature_name: String,
    use_global: bool,
    explanations: Vec<Explanation>,
    output_feature_map: HashMap<String, OutputFeature>,
    target_kind: TargetKind,
}

impl<'a, M: PredictModel> ExplainerBase<'a, M> {
    /// Prepares `inputs` and `sample` for explaining `target`.
    ///
    /// # Errors
    /// Fails if the rows do not carry the model's input columns, if either
    /// frame is empty, or if `target` is not an explainable output feature (unknown
    /// name, unsupported type, category without a vocabulary size).
    pub fn new(model: &'a M, inputs: &Frame, sample: &Frame, target: &str, use_global: bool) -> Result<Self> {
        let prepared = prepare_data(model, inputs, sample, target)?;

        let explanations = if use_global {
            vec![Explanation::new(prepared.target_feature_name.clone())]
        } else {
            (0..prepared.inputs.nrows())
                .map(|_| Explanation::new(prepared.target_feature_name.clone()))
                .collect()
        };

        // Lookup from column name to output feature
        let metadata = model.training_set_metadata();
        let output_feature_map: HashMap<String, OutputFeature> = model
            .config()
            .output_features
            .iter()
            .map(|f| (f.column().to_string(), OutputFeature::resolve(f, metadata)))
            .collect();

        let target_kind = output_feature_map
            .get(&prepared.target_feature_name)
            .ok_or_else(|| ExplainError::UnknownTarget(prepared.target_feature_name.clone()))?
            .target_kind()?;
        debug!(
            "explaining '{}' as {:?} over {} placeholders (global: {})",
            prepared.target_feature_name,
            target_kind,
            explanations.len(),
            use_global
        );

        Ok(ExplainerBase {
            model,
            inputs: prepared.inputs,
            sample: prepared.sample,
            feature_cols: prepared.feature_cols,
            target_feature_name: prepared.target_feature_name,
            use_global,
            explanations,
            output_feature_map,
            target_kind,
        })
    }

    pub fn model(&self) -> &'a M {
        self.model
    }

    /// Rows to explain, projected onto [`Self::feature_cols`].
    pub fn inputs(&self) -> &Frame {
        &self.inputs
    }

    /// Background rows, projected onto [`Self::feature_cols`].
    pub fn sample(&self) -> &Frame {
        &self.sample
    }

    pub fn feature_cols(&self) -> &[String] {
        &self.feature_cols
    }

    pub fn target_feature_name(&self) -> &str {
        &self.target_feature_name
    }

    pub fn use_global(&self) -> bool {
        self.use_global
    }

    /// Placeholders the strategy fills: one per input row, or one in global mode.
    pub fn explanations(&self) -> &[Explanation] {
        &self.explanations
    }

    pub fn output_feature_map(&self) -> &HashMap<String, OutputFeature> {
        &self.output_feature_map
    }

    pub fn target_kind(&self) -> TargetKind {
        self.target_kind
    }

    pub fn is_binary_target(&self) -> bool {
        self.target_kind == TargetKind::Binary
    }

    pub fn is_category_target(&self) -> bool {
        matches!(self.target_kind, TargetKind::Category { .. })
    }

    /// 1 for number targets, 2 for binary, the vocabulary size for category.
    pub fn vocab_size(&self) -> usize {
        self.target_kind.vocab_size()
    }

    /// Predicts the target for `rows`, checking the model returned one column per label.
    pub fn predict(&self, rows: &Dataset) -> Result<Dataset> {
        let predictions = self.model.predict(rows, &self.target_feature_name)?;
        if predictions.dim() != (rows.nrows(), self.vocab_size()) {
            return Err(ExplainError::ModelPredictionError(format!(
                "Model returned predictions of shape {:?} for '{}', expected ({}, {}).",
                predictions.dim(),
                self.target_feature_name,
                rows.nrows(),
                self.vocab_size()
            )));
        }
        Ok(predictions)
    }

    /// Mean prediction over the sample rows, per label.
    pub fn expected_values(&self) -> Result<Vec<f64>> {
        let predictions = self.predict(self.sample.values())?;
        predictions
            .mean_axis(Axis(0))
            .map(|mean| mean.to_vec())
            .ok_or_else(|| ExplainError::InternalError("Failed to average sample predictions.".to_string()))
    }

    /// Fills the placeholders from per-row `[labels, features]` attribution matrices.
    ///
    /// In global mode the rows are averaged into the single placeholder.
    pub fn finish(self, row_attributions: Vec<Array2<f64>>) -> Result<Vec<Explanation>> {
        let expected_dim = (self.vocab_size(), self.feature_cols.len());
        if row_attributions.len() != self.inputs.nrows() {
            return Err(ExplainError::InternalError(format!(
                "Got attributions for {} rows, expected {}.",
                row_attributions.len(),
                self.inputs.nrows()
            )));
        }
        if let Some(bad) = row_attributions.iter().find(|a| a.dim() != expected_dim) {
            return Err(ExplainError::IncompatibleDimensions(format!(
                "Row attributions have shape {:?}, expected {:?}.",
                bad.dim(),
                expected_dim
            )));
        }

        let per_explanation = if self.use_global {
            if row_attributions.is_empty() {
                return Err(ExplainError::InvalidInput("Cannot average attributions over zero rows.".to_string()));
            }
            let mut sum = Array2::zeros(expected_dim);
            for attributions in &row_attributions {
                sum += attributions;
            }
            sum /= row_attributions.len() as f64;
            vec![sum]
        } else {
            row_attributions
        };

        let mut explanations = self.explanations;
        for (explanation, attributions) in explanations.iter_mut().zip(&per_explanation) {
            for label_row in attributions.rows() {
                explanation.add(&self.feature_cols, label_row)?;
            }
        }
        Ok(explanations)
    }
}
