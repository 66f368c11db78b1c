// src/algorithms/integrated_gradients.rs

use crate::core::{Dataset, ExplainError, Explanation, Frame, Instance, Result};
use crate::explainer::ExplainerBase;
use crate::traits::{Explainer, PredictModel};
use log::info;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratedGradientsConfig {
    /// Steps of the Riemann approximation of the path integral.
    pub n_steps: usize,
    /// Half-width of the central difference used for gradients.
    pub epsilon: f64,
    /// Most rows sent to the model per `predict` call.
    pub batch_size: usize,
}

impl Default for IntegratedGradientsConfig {
    fn default() -> Self {
        IntegratedGradientsConfig {
            n_steps: 50,
            epsilon: 1e-4,
            batch_size: 4096,
        }
    }
}

impl IntegratedGradientsConfig {
    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Integrated Gradients from the mean sample row to each input row.
///
/// Gradients come from central differences through the model's `predict`,
/// so any [`PredictModel`] works. The points on the path of one row go to
/// the model in batches of at most `batch_size` rows.
#[derive(Debug)]
pub struct IntegratedGradientsExplainer<'a, M: PredictModel> {
    base: ExplainerBase<'a, M>,
    config: IntegratedGradientsConfig,
    baseline: Instance,
}

impl<'a, M: PredictModel> IntegratedGradientsExplainer<'a, M> {
    pub fn new(
        model: &'a M,
        inputs: &Frame,
        sample: &Frame,
        target: &str,
        use_global: bool,
        config: Option<IntegratedGradientsConfig>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();
        if config.n_steps == 0 {
            return Err(ExplainError::InvalidInput("n_steps must be at least 1.".to_string()));
        }
        if !config.epsilon.is_finite() || config.epsilon <= 0.0 {
            return Err(ExplainError::InvalidInput(format!(
                "epsilon must be positive, got {}.",
                config.epsilon
            )));
        }
        if config.batch_size < 2 {
            return Err(ExplainError::InvalidInput(format!(
                "batch_size must be at least 2, got {}.",
                config.batch_size
            )));
        }

        let base = ExplainerBase::new(model, inputs, sample, target, use_global)?;
        let baseline = base
            .sample()
            .values()
            .mean_axis(Axis(0))
            .ok_or_else(|| ExplainError::InvalidInput("Sample rows cannot be empty.".to_string()))?;
        Ok(IntegratedGradientsExplainer { base, config, baseline })
    }

    pub fn base(&self) -> &ExplainerBase<'a, M> {
        &self.base
    }

    pub fn config(&self) -> &IntegratedGradientsConfig {
        &self.config
    }

    /// Column means of the sample rows.
    pub fn baseline(&self) -> &Instance {
        &self.baseline
    }

    /// Attributions of one instance as a `[labels, features]` matrix.
    fn attribute(&self, instance: &Instance) -> Result<Array2<f64>> {
        let n = instance.len();
        let n_steps = self.config.n_steps;
        let eps = self.config.epsilon;

        let delta = instance - &self.baseline;
        let mut attributions = Array2::zeros((self.base.vocab_size(), n));

        // Pair p = step*n + i differentiates feature i at interpolation step
        // `step`; its rows are x_interp + eps and x_interp - eps on that feature.
        let n_pairs = n_steps * n;
        let pairs_per_batch = self.config.batch_size / 2;
        let mut batch_start = 0;
        while batch_start < n_pairs {
            let batch_end = (batch_start + pairs_per_batch).min(n_pairs);
            let mut path = Dataset::zeros((2 * (batch_end - batch_start), n));
            for p in batch_start..batch_end {
                let (step, i) = (p / n, p % n);
                let alpha = (step as f64 + 0.5) / n_steps as f64;
                let x_interp = &self.baseline + &(&delta * alpha);
                let row = 2 * (p - batch_start);
                path.row_mut(row).assign(&x_interp);
                path.row_mut(row + 1).assign(&x_interp);
                path[[row, i]] += eps;
                path[[row + 1, i]] -= eps;
            }
            let outputs = self.base.predict(&path)?;

            for p in batch_start..batch_end {
                let i = p % n;
                let row = 2 * (p - batch_start);
                for label in 0..attributions.nrows() {
                    let grad = (outputs[[row, label]] - outputs[[row + 1, label]]) / (2.0 * eps);
                    attributions[[label, i]] += grad / n_steps as f64;
                }
            }
            batch_start = batch_end;
        }

        for mut label_row in attributions.rows_mut() {
            label_row *= &delta;
        }
        Ok(attributions)
    }
}

impl<'a, M: PredictModel> Explainer for IntegratedGradientsExplainer<'a, M> {
    fn explain(self) -> Result<(Vec<Explanation>, Vec<f64>)> {
        info!(
            "integrated gradients: explaining '{}' for {} rows with {} steps",
            self.base.target_feature_name(),
            self.base.inputs().nrows(),
            self.config.n_steps
        );
        let expected_values = self
            .base
            .predict(&self.baseline.view().insert_axis(Axis(0)).to_owned())?
            .row(0)
            .to_vec();

        let row_attributions = self
            .base
            .inputs()
            .values()
            .rows()
            .into_iter()
            .map(|row| self.attribute(&row.to_owned()))
            .collect::<Result<Vec<_>>>()?;

        let explanations = self.base.finish(row_attributions)?;
        info!("integrated gradients: produced {} explanations", explanations.len());
        Ok((explanations, expected_values))
    }
}
