// src/core/data.rs
use crate::core::{ExplainError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a single data instance (a row of features).
/// We use `f64` for flexibility with various model outputs and calculations.
pub type Instance = Array1<f64>;

/// Represents a dataset (multiple instances, e.g., background data).
pub type Dataset = Array2<f64>;

/// Attribution of one input feature towards one label of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature_name: String,
    pub attribution: f64,
}

/// Attributions for a single label of the target, in feature-column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelExplanation {
    pub feature_attributions: Vec<FeatureAttribution>,
}

impl LabelExplanation {
    pub fn to_array(&self) -> Array1<f64> {
        self.feature_attributions.iter().map(|fa| fa.attribution).collect()
    }
}

/// Explanation of one row (or of all rows, in global mode) for a target.
///
/// Holds one [`LabelExplanation`] per label of the target: 1 for numeric
/// targets, 2 for binary, the vocabulary size for categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub target: String,
    pub label_explanations: Vec<LabelExplanation>,
}

impl Explanation {
    /// An empty placeholder, filled label by label with [`Explanation::add`].
    pub fn new(target: impl Into<String>) -> Self {
        Explanation {
            target: target.into(),
            label_explanations: Vec::new(),
        }
    }

    /// Appends the attributions of the next label.
    pub fn add(&mut self, feature_names: &[String], attributions: ArrayView1<f64>) -> Result<()> {
        if feature_names.len() != attributions.len() {
            return Err(ExplainError::IncompatibleDimensions(format!(
                "{} feature names but {} attributions.",
                feature_names.len(),
                attributions.len()
            )));
        }
        let feature_attributions = feature_names
            .iter()
            .zip(attributions.iter())
            .map(|(name, &attribution)| FeatureAttribution {
                feature_name: name.clone(),
                attribution,
            })
            .collect();
        self.label_explanations.push(LabelExplanation { feature_attributions });
        Ok(())
    }

    pub fn num_labels(&self) -> usize {
        self.label_explanations.len()
    }

    /// Attributions as a `[labels, features]` matrix.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let n_labels = self.label_explanations.len();
        let n_features = self
            .label_explanations
            .first()
            .map_or(0, |le| le.feature_attributions.len());
        let mut flat = Vec::with_capacity(n_labels * n_features);
        for le in &self.label_explanations {
            if le.feature_attributions.len() != n_features {
                return Err(ExplainError::IncompatibleDimensions(format!(
                    "Ragged explanation for '{}': labels carry differing feature counts.",
                    self.target
                )));
            }
            flat.extend(le.feature_attributions.iter().map(|fa| fa.attribution));
        }
        Ok(Array2::from_shape_vec((n_labels, n_features), flat)?)
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation for '{}':", self.target)?;
        for (label, le) in self.label_explanations.iter().enumerate() {
            writeln!(f, "  Label {}:", label)?;
            for fa in &le.feature_attributions {
                writeln!(f, "    {}: {:.4}", fa.feature_name, fa.attribution)?;
            }
        }
        Ok(())
    }
}

/// Everything an explanation run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationsResult {
    /// Mean of the row explanations, or the single aggregated explanation in global mode.
    pub global_explanation: Explanation,
    /// One per input row; a single entry in global mode.
    pub row_explanations: Vec<Explanation>,
    /// Baseline value per label, aligned with the label order of the attributions.
    pub expected_values: Vec<f64>,
}

impl ExplanationsResult {
    pub fn new(row_explanations: Vec<Explanation>, expected_values: Vec<f64>) -> Result<Self> {
        let first = row_explanations.first().ok_or_else(|| {
            ExplainError::InvalidInput("Cannot summarise an empty set of explanations.".to_string())
        })?;
        let target = first.target.clone();
        let feature_names: Vec<String> = first
            .label_explanations
            .first()
            .map(|le| le.feature_attributions.iter().map(|fa| fa.feature_name.clone()).collect())
            .unwrap_or_default();

        let mut sum = first.to_array()?;
        for explanation in &row_explanations[1..] {
            let arr = explanation.to_array()?;
            if arr.dim() != sum.dim() {
                return Err(ExplainError::IncompatibleDimensions(format!(
                    "Row explanation has shape {:?}, expected {:?}.",
                    arr.dim(),
                    sum.dim()
                )));
            }
            sum += &arr;
        }
        let mean = sum / row_explanations.len() as f64;

        let mut global_explanation = Explanation::new(target);
        for label_row in mean.rows() {
            global_explanation.add(&feature_names, label_row)?;
        }

        Ok(ExplanationsResult {
            global_explanation,
            row_explanations,
            expected_values,
        })
    }
}
