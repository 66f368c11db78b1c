// src/config.rs

//! Model configuration schema and training-set metadata, as far as
//! explainers need them, plus the typed view of output features.

use crate::core::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BINARY: &str = "binary";
pub const CATEGORY: &str = "category";
pub const NUMBER: &str = "number";

/// One input or output feature entry of a model config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    /// Column holding the feature in tabular data; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub feature_type: String,
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>, feature_type: impl Into<String>) -> Self {
        FeatureConfig {
            name: name.into(),
            column: None,
            feature_type: feature_type.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub input_features: Vec<FeatureConfig>,
    pub output_features: Vec<FeatureConfig>,
}

impl ModelConfig {
    /// Parses the feature sections of a model config; unrelated sections are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Statistics recorded for one feature while preprocessing the training set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab_size: Option<usize>,
}

/// Per-feature training metadata, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingSetMetadata(HashMap<String, FeatureMetadata>);

impl TrainingSetMetadata {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, feature: impl Into<String>, metadata: FeatureMetadata) {
        self.0.insert(feature.into(), metadata);
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureMetadata> {
        self.0.get(feature)
    }
}

/// Declared type of an output feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureType {
    Binary,
    Category { vocab_size: Option<usize> },
    Number,
    /// Any type explainers cannot attribute (text, sequence, set, ...).
    Other(String),
}

/// An output feature resolved against the training metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFeature {
    pub name: String,
    pub column: String,
    pub feature_type: FeatureType,
}

impl OutputFeature {
    pub fn resolve(config: &FeatureConfig, metadata: &TrainingSetMetadata) -> Self {
        let feature_type = match config.feature_type.as_str() {
            BINARY => FeatureType::Binary,
            CATEGORY => FeatureType::Category {
                vocab_size: metadata
                    .get(&config.name)
                    .or_else(|| metadata.get(config.column()))
                    .and_then(|m| m.vocab_size),
            },
            NUMBER | "numerical" => FeatureType::Number,
            other => FeatureType::Other(other.to_string()),
        };
        OutputFeature {
            name: config.name.clone(),
            column: config.column().to_string(),
            feature_type,
        }
    }

    /// The attribution-ready kind of this feature, or why it cannot be a target.
    pub fn target_kind(&self) -> Result<TargetKind> {
        match &self.feature_type {
            FeatureType::Binary => Ok(TargetKind::Binary),
            FeatureType::Category { vocab_size: Some(v) } => Ok(TargetKind::Category { vocab_size: *v }),
            FeatureType::Category { vocab_size: None } => Err(ExplainError::MissingValue(format!(
                "No vocab_size in the training set metadata of category feature '{}'.",
                self.name
            ))),
            FeatureType::Number => Ok(TargetKind::Number),
            FeatureType::Other(t) => Err(ExplainError::UnsupportedTarget {
                name: self.name.clone(),
                feature_type: t.clone(),
            }),
        }
    }
}

/// Output feature kinds that can be explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Binary,
    Category { vocab_size: usize },
    Number,
}

impl TargetKind {
    /// Number of label slots: 1 for numbers, 2 for binary, the vocabulary for categories.
    pub fn vocab_size(&self) -> usize {
        match self {
            TargetKind::Binary => 2,
            TargetKind::Category { vocab_size } => *vocab_size,
            TargetKind::Number => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "input_features": [
            {"name": "age", "type": "number"},
            {"name": "plan", "column": "plan_id", "type": "category"}
        ],
        "output_features": [
            {"name": "churn", "type": "binary"},
            {"name": "segment", "type": "category"}
        ],
        "trainer": {"epochs": 10}
    }"#;

    #[test]
    fn parses_config_and_defaults_column() -> Result<()> {
        let config = ModelConfig::from_json(CONFIG)?;
        assert_eq!(config.input_features.len(), 2);
        assert_eq!(config.input_features[0].column(), "age");
        assert_eq!(config.input_features[1].column(), "plan_id");
        assert_eq!(config.output_features[1].feature_type, CATEGORY);
        Ok(())
    }

    #[test]
    fn resolves_category_vocab_from_metadata() -> Result<()> {
        let metadata = TrainingSetMetadata::from_json(
            r#"{"segment": {"vocab_size": 5, "idx2str": ["a", "b", "c", "d", "e"]}}"#,
        )?;
        let feature = OutputFeature::resolve(&FeatureConfig::new("segment", CATEGORY), &metadata);
        assert_eq!(feature.target_kind()?, TargetKind::Category { vocab_size: 5 });
        assert_eq!(feature.target_kind()?.vocab_size(), 5);
        Ok(())
    }

    #[test]
    fn category_without_vocab_is_missing_value() {
        let feature = OutputFeature::resolve(&FeatureConfig::new("segment", CATEGORY), &TrainingSetMetadata::default());
        assert!(matches!(feature.target_kind(), Err(ExplainError::MissingValue(_))));
    }

    #[test]
    fn other_types_are_unsupported() {
        let feature = OutputFeature::resolve(&FeatureConfig::new("caption", "text"), &TrainingSetMetadata::default());
        assert_eq!(feature.feature_type, FeatureType::Other("text".to_string()));
        assert!(matches!(feature.target_kind(), Err(ExplainError::UnsupportedTarget { .. })));
    }

    #[test]
    fn vocab_sizes_per_kind() {
        assert_eq!(TargetKind::Number.vocab_size(), 1);
        assert_eq!(TargetKind::Binary.vocab_size(), 2);
        assert_eq!(TargetKind::Category { vocab_size: 7 }.vocab_size(), 7);
    }
}
