// src/algorithms/mod.rs

pub mod integrated_gradients;
pub mod kernel_shap;

pub use integrated_gradients::{IntegratedGradientsConfig, IntegratedGradientsExplainer};
pub use kernel_shap::{KernelExplainer, KernelShapConfig, KernelShapSamples};

use crate::core::{ExplanationsResult, Frame, Result};
use crate::traits::{Explainer, PredictModel};
use serde::{Deserialize, Serialize};

/// Attribution strategy, with its settings.
///
/// ```json
/// {"method": "kernel_shap", "n_samples": {"fixed": 256}, "seed": 7}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ExplainerKind {
    KernelShap(KernelShapConfig),
    IntegratedGradients(IntegratedGradientsConfig),
}

impl Default for ExplainerKind {
    fn default() -> Self {
        ExplainerKind::IntegratedGradients(IntegratedGradientsConfig::default())
    }
}

/// Runs the selected explainer and summarises its output.
pub fn explain<M: PredictModel>(
    kind: &ExplainerKind,
    model: &M,
    inputs: &Frame,
    sample: &Frame,
    target: &str,
    use_global: bool,
) -> Result<ExplanationsResult> {
    let (explanations, expected_values) = match kind {
        ExplainerKind::KernelShap(config) => {
            KernelExplainer::new(model, inputs, sample, target, use_global, Some(config.clone()))?.explain()?
        }
        ExplainerKind::IntegratedGradients(config) => {
            IntegratedGradientsExplainer::new(model, inputs, sample, target, use_global, Some(config.clone()))?
                .explain()?
        }
    };
    ExplanationsResult::new(explanations, expected_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExplainError;
    use crate::test_models::TestModel;
    use ndarray::array;

    #[test]
    fn kind_deserializes_with_method_tag() -> Result<()> {
        let kind: ExplainerKind = serde_json::from_str(r#"{"method": "kernel_shap", "seed": 7}"#)?;
        match kind {
            ExplainerKind::KernelShap(config) => {
                assert_eq!(config.seed, Some(7));
                assert_eq!(config.n_samples, KernelShapSamples::Auto);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let kind: ExplainerKind = serde_json::from_str(r#"{"method": "integrated_gradients", "n_steps": 10}"#)?;
        assert!(matches!(kind, ExplainerKind::IntegratedGradients(ref c) if c.n_steps == 10));
        Ok(())
    }

    #[test]
    fn dispatch_runs_each_method() -> Result<()> {
        let model = TestModel::number(array![1.0, 2.0], 0.0);
        let inputs = Frame::from_rows(&["x0", "x1"], 3, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0])?;
        let sample = Frame::from_rows(&["x0", "x1"], 1, vec![0.0, 0.0])?;

        for kind in [
            ExplainerKind::default(),
            ExplainerKind::KernelShap(KernelShapConfig::default().with_seed(1)),
        ] {
            let result = explain(&kind, &model, &inputs, &sample, "price", false)?;
            assert_eq!(result.row_explanations.len(), 3);
            assert_eq!(result.expected_values.len(), 1);
            assert_eq!(result.global_explanation.num_labels(), 1);
        }
        Ok(())
    }

    #[test]
    fn empty_inputs_rejected_by_every_entry_point() -> Result<()> {
        let model = TestModel::number(array![1.0, 2.0], 0.0);
        let empty = Frame::from_rows(&["x0", "x1"], 0, Vec::new())?;
        let sample = Frame::from_rows(&["x0", "x1"], 1, vec![0.0, 0.0])?;

        for use_global in [false, true] {
            assert!(matches!(
                KernelExplainer::new(&model, &empty, &sample, "price", use_global, None),
                Err(ExplainError::InvalidInput(_))
            ));
            assert!(matches!(
                IntegratedGradientsExplainer::new(&model, &empty, &sample, "price", use_global, None),
                Err(ExplainError::InvalidInput(_))
            ));
            assert!(matches!(
                explain(&ExplainerKind::default(), &model, &empty, &sample, "price", use_global),
                Err(ExplainError::InvalidInput(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn dispatch_surfaces_target_errors() -> Result<()> {
        let model = TestModel::number(array![1.0], 0.0);
        let rows = Frame::from_rows(&["x0"], 1, vec![1.0])?;
        let err = explain(&ExplainerKind::default(), &model, &rows, &rows, "nope", false).unwrap_err();
        assert!(matches!(err, ExplainError::UnknownTarget(_)));
        Ok(())
    }
}
