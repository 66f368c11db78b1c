// src/lib.rs

//! `explain_rs` attributes the predictions of a trained tabular model to its
//! input features, for one target output and a background sample.
//!
//! Every strategy composes an [`ExplainerBase`] (prepared rows, resolved
//! target, explanation placeholders) and implements [`Explainer`].
//!
//! ```ignore
//! use explain_rs::{explain, ExplainerKind, Frame};
//!
//! let inputs = Frame::from_rows(&["age", "income"], 2, vec![31.0, 52.0, 47.0, 80.0])?;
//! let sample = Frame::from_rows(&["age", "income"], 1, vec![40.0, 60.0])?;
//! let result = explain(&ExplainerKind::default(), &model, &inputs, &sample, "churn", false)?;
//! println!("{}", result.global_explanation);
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod explainer;
pub mod traits;
pub mod utils;

#[cfg(test)]
mod test_models;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{
    explain, ExplainerKind, IntegratedGradientsConfig, IntegratedGradientsExplainer, KernelExplainer,
    KernelShapConfig, KernelShapSamples,
};
pub use crate::config::{FeatureConfig, FeatureMetadata, ModelConfig, OutputFeature, TargetKind, TrainingSetMetadata};
pub use crate::core::{
    Dataset, ExplainError, Explanation, ExplanationsResult, FeatureAttribution, Frame, Instance, LabelExplanation,
    Result,
};
pub use crate::explainer::ExplainerBase;
pub use crate::traits::{Explainer, PredictModel};
pub use crate::utils::{prepare_data, PreparedData};
