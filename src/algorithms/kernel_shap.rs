// src/algorithms/kernel_shap.rs

use crate::core::{Dataset, ExplainError, Explanation, Frame, Instance, Result};
use crate::explainer::ExplainerBase;
use crate::traits::{Explainer, PredictModel};
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the KernelSHAP explainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelShapConfig {
    pub n_samples: KernelShapSamples,
    /// Gaussian noise added to masked features when the background has a single row.
    pub noise_std_dev: f64,
    /// Seed for coalition sampling and noise; entropy when `None`.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShapSamples {
    Auto,
    Fixed(usize),
}

impl Default for KernelShapConfig {
    fn default() -> Self {
        KernelShapConfig {
            n_samples: KernelShapSamples::Auto,
            noise_std_dev: 0.0,
            seed: None,
        }
    }
}

impl KernelShapConfig {
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = KernelShapSamples::Fixed(n);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_noise(mut self, std_dev: f64) -> Self {
        self.noise_std_dev = std_dev;
        self
    }
}

/// Shapley values estimated by weighted linear regression over feature coalitions.
///
/// Masked features take their values from each background (sample) row in
/// turn, and the model outputs are averaged over the background.
#[derive(Debug)]
pub struct KernelExplainer<'a, M: PredictModel> {
    base: ExplainerBase<'a, M>,
    config: KernelShapConfig,
}

impl<'a, M: PredictModel> KernelExplainer<'a, M> {
    pub fn new(
        model: &'a M,
        inputs: &Frame,
        sample: &Frame,
        target: &str,
        use_global: bool,
        config: Option<KernelShapConfig>,
    ) -> Result<Self> {
        let base = ExplainerBase::new(model, inputs, sample, target, use_global)?;
        Ok(KernelExplainer {
            base,
            config: config.unwrap_or_default(),
        })
    }

    pub fn base(&self) -> &ExplainerBase<'a, M> {
        &self.base
    }

    pub fn config(&self) -> &KernelShapConfig {
        &self.config
    }

    fn num_features(&self) -> usize {
        self.base.feature_cols().len()
    }

    /// Attributions of one instance as a `[labels, features]` matrix.
    fn shap_values(&self, instance: &Instance, expected_values: &[f64], rng: &mut StdRng) -> Result<Array2<f64>> {
        let num_features = self.num_features();
        if instance.len() != num_features {
            return Err(ExplainError::IncompatibleDimensions(format!(
                "Instance to explain has {} features, but explainer expects {}.",
                instance.len(),
                num_features
            )));
        }

        let n_samples_config = match self.config.n_samples {
            KernelShapSamples::Auto => 2 * num_features + 2048,
            KernelShapSamples::Fixed(n) => n,
        };

        let max_possible_samples = 1_usize.checked_shl(num_features as u32).unwrap_or(usize::MAX);
        let actual_n_samples = n_samples_config.min(max_possible_samples).max(1);

        if num_features > 20 && actual_n_samples >= max_possible_samples {
            return Err(ExplainError::InvalidInput(format!(
                "Number of features ({}) is too large to generate all coalitions. Please use sampling.",
                num_features
            )));
        }
        let (coalition_matrix, weights) = self.generate_coalitions(actual_n_samples, rng)?;
        let n_coalitions = coalition_matrix.nrows();

        let background = self.base.sample().values();
        let n_background = background.nrows();
        let mut perturbed_instances_vec: Vec<f64> = Vec::with_capacity(n_coalitions * n_background * num_features);

        for coalition_vector in coalition_matrix.rows() {
            for background_sample in background.rows() {
                for feat_idx in 0..num_features {
                    let value = if coalition_vector[feat_idx] == 1.0 {
                        instance[feat_idx]
                    } else if n_background == 1 && self.config.noise_std_dev > 0.0 {
                        let noise_sample: f64 = StandardNormal.sample(rng);
                        background_sample[feat_idx] + noise_sample * self.config.noise_std_dev
                    } else {
                        background_sample[feat_idx]
                    };
                    perturbed_instances_vec.push(value);
                }
            }
        }

        let perturbed_dataset =
            Dataset::from_shape_vec((n_coalitions * n_background, num_features), perturbed_instances_vec)?;
        let model_outputs = self.base.predict(&perturbed_dataset)?;
        let full_prediction = self
            .base
            .predict(&instance.view().insert_axis(Axis(0)).to_owned())?
            .row(0)
            .to_owned();

        let vocab_size = self.base.vocab_size();
        let mut averaged_model_outputs = Array2::zeros((n_coalitions, vocab_size));
        for i in 0..n_coalitions {
            let outputs_for_coalition = model_outputs.slice(s![i * n_background..(i + 1) * n_background, ..]);
            let mean = outputs_for_coalition.mean_axis(Axis(0)).ok_or_else(|| {
                ExplainError::InternalError("Failed to average outputs over the background.".to_string())
            })?;
            averaged_model_outputs.row_mut(i).assign(&mean);
        }

        let mut attributions = Array2::zeros((vocab_size, num_features));
        for label in 0..vocab_size {
            let coeffs = self.solve_weighted_least_squares(
                coalition_matrix.view(),
                averaged_model_outputs.column(label),
                weights.view(),
            )?;
            if coeffs.len() != num_features + 1 {
                return Err(ExplainError::InternalError(format!(
                    "WLS solver returned {} coefficients, expected {}.",
                    coeffs.len(),
                    num_features + 1
                )));
            }
            let mut phi = coeffs.slice(s![1..]).to_owned();

            // Attributions must add up to f(x) - E[f(x)].
            let diff = (full_prediction[label] - expected_values[label]) - phi.sum();
            if diff.abs() > 1e-4 {
                debug!("label {}: spreading additivity gap {:.6} over features", label, diff);
            }
            phi.mapv_inplace(|v| v + diff / num_features as f64);
            attributions.row_mut(label).assign(&phi);
        }
        Ok(attributions)
    }

    fn generate_coalitions(&self, n_to_sample: usize, rng: &mut StdRng) -> Result<(Dataset, Array1<f64>)> {
        let m = self.num_features();
        if m == 0 {
            return Ok((Dataset::zeros((0, 0)), Array1::zeros(0)));
        }

        let max_coalitions = 1_usize.checked_shl(m as u32).unwrap_or(usize::MAX);

        if n_to_sample >= max_coalitions && m <= 20 {
            let mut coalitions = Dataset::zeros((max_coalitions, m));
            let mut weights = Array1::zeros(max_coalitions);
            for i in 0..max_coalitions {
                let mut current_coalition_size = 0;
                for j in 0..m {
                    if (i >> j) & 1 == 1 {
                        coalitions[[i, j]] = 1.0;
                        current_coalition_size += 1;
                    }
                }
                weights[i] = Self::kernel_weight(current_coalition_size, m);
            }
            return Ok((coalitions, weights));
        }

        let mut coalitions: Vec<Vec<bool>> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();

        // Empty and full coalitions anchor the regression.
        coalitions.push(vec![false; m]);
        weights.push(Self::kernel_weight(0, m));
        coalitions.push(vec![true; m]);
        weights.push(Self::kernel_weight(m, m));

        // Sizes k and m-k are taken together. Pairs are enumerated outright,
        // smallest first, while their coalitions fit in the budget.
        let mut remaining_budget = n_to_sample.saturating_sub(2);
        let mut remaining_mass: f64 = (1..m).map(|k| Self::size_weight(k, m)).sum();
        let mut next_size = 1;
        while next_size <= m / 2 {
            let paired = next_size != m - next_size;
            let count = Self::n_choose_k(m, next_size) * if paired { 2.0 } else { 1.0 };
            if count > remaining_budget as f64 {
                break;
            }
            let weight = Self::kernel_weight(next_size, m);
            for_each_combination(m, next_size, |members| {
                let mut coalition = vec![false; m];
                for &idx in members {
                    coalition[idx] = true;
                }
                if paired {
                    coalitions.push(coalition.iter().map(|&b| !b).collect());
                    weights.push(weight);
                }
                coalitions.push(coalition);
                weights.push(weight);
            });
            remaining_budget -= count as usize;
            remaining_mass -= Self::size_weight(next_size, m) * if paired { 2.0 } else { 1.0 };
            next_size += 1;
        }

        // The remaining sizes are drawn in proportion to their kernel mass, each
        // draw together with its complement. Every draw then carries the same
        // weight and repeated coalitions accumulate it.
        if next_size <= m / 2 && remaining_budget > 0 {
            let sizes: Vec<usize> = (next_size..=m - next_size).collect();
            let size_dist = WeightedIndex::new(sizes.iter().map(|&k| Self::size_weight(k, m)))
                .map_err(|e| ExplainError::InternalError(format!("Invalid coalition size weights: {}", e)))?;
            let features_indices: Vec<usize> = (0..m).collect();
            let n_draws = (remaining_budget / 2).max(1);

            let mut sampled: Vec<(Vec<bool>, usize)> = Vec::new();
            let mut seen: HashMap<Vec<bool>, usize> = HashMap::new();
            let mut record = |coalition: Vec<bool>| match seen.get(&coalition).copied() {
                Some(slot) => sampled[slot].1 += 1,
                None => {
                    seen.insert(coalition.clone(), sampled.len());
                    sampled.push((coalition, 1));
                }
            };
            for _ in 0..n_draws {
                let k = sizes[size_dist.sample(rng)];
                let mut coalition = vec![false; m];
                for &idx in features_indices.choose_multiple(rng, k) {
                    coalition[idx] = true;
                }
                record(coalition.iter().map(|&b| !b).collect());
                record(coalition);
            }

            let weight_per_draw = remaining_mass / (2 * n_draws) as f64;
            debug!(
                "sampled {} distinct coalitions of sizes {}..={} from {} paired draws",
                sampled.len(),
                next_size,
                m - next_size,
                n_draws
            );
            for (coalition, hits) in sampled {
                coalitions.push(coalition);
                weights.push(weight_per_draw * hits as f64);
            }
        }

        let n_coalitions = coalitions.len();
        let flat: Vec<f64> = coalitions
            .iter()
            .flat_map(|c| c.iter().map(|&b| if b { 1.0 } else { 0.0 }))
            .collect();
        Ok((Dataset::from_shape_vec((n_coalitions, m), flat)?, Array1::from_vec(weights)))
    }

    /// Total kernel weight of all coalitions of one size: (M-1) / (|z'| * (M-|z'|)).
    fn size_weight(coalition_size: usize, num_features: usize) -> f64 {
        (num_features - 1) as f64 / (coalition_size * (num_features - coalition_size)) as f64
    }

    /// Shapley kernel weight of a coalition.
    /// pi_x(z') = (M-1) / (C(M, |z'|) * |z'| * (M-|z'|))
    /// Empty and full coalitions get a very large weight standing in for infinity.
    fn kernel_weight(coalition_size: usize, num_features: usize) -> f64 {
        if coalition_size == 0 || coalition_size == num_features || num_features <= 1 {
            return 1e9;
        }
        let combinations_val = Self::n_choose_k(num_features, coalition_size);
        let denominator = combinations_val * coalition_size as f64 * (num_features - coalition_size) as f64;
        if denominator == 0.0 {
            return 1e9;
        }
        (num_features - 1) as f64 / denominator
    }

    /// C(n, k) = n! / (k! * (n-k)!)
    fn n_choose_k(n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        if k == 0 || k == n {
            return 1.0;
        }
        let eff_k = if k > n / 2 { n - k } else { k };

        let mut res = 1.0;
        for i in 0..eff_k {
            res *= (n - i) as f64;
            res /= (i + 1) as f64;
        }
        res
    }

    /// Weighted least squares with an intercept; returns `[intercept, coefficients...]`.
    fn solve_weighted_least_squares(
        &self,
        features: ArrayView2<f64>,
        target: ArrayView1<f64>,
        weights: ArrayView1<f64>,
    ) -> Result<Array1<f64>> {
        let n_samples = features.nrows();
        let n_coeffs_to_solve = features.ncols() + 1;

        let effective_samples = weights.iter().filter(|&&w| w > 1e-9).count();
        if effective_samples < n_coeffs_to_solve {
            return Err(ExplainError::InternalError(format!(
                "Underdetermined system in WLS: {} effective samples, {} coefficients to solve. Increase n_samples.",
                effective_samples, n_coeffs_to_solve
            )));
        }

        let mut x_w = Array2::zeros((n_samples, n_coeffs_to_solve));
        let mut y_w = Array1::zeros(n_samples);
        for i in 0..n_samples {
            let sqrt_w = if weights[i] < 1e-9 { 0.0 } else { weights[i].sqrt() };
            x_w[[i, 0]] = sqrt_w;
            for j in 1..n_coeffs_to_solve {
                x_w[[i, j]] = features[[i, j - 1]] * sqrt_w;
            }
            y_w[i] = target[i] * sqrt_w;
        }

        #[cfg(feature = "linalg")]
        {
            use ndarray_linalg::LeastSquaresSvd;
            let results = x_w
                .least_squares(&y_w)
                .map_err(|e| ExplainError::InternalError(format!("WLS solver SVD failed: {}", e)))?;
            if results.rank < n_coeffs_to_solve as i32 {
                warn!(
                    "rank-deficient coalition matrix (rank {} < {}); attributions may be unstable",
                    results.rank, n_coeffs_to_solve
                );
            }
            Ok(results.solution)
        }
        #[cfg(not(feature = "linalg"))]
        {
            let xtx = x_w.t().dot(&x_w);
            let xty = x_w.t().dot(&y_w);
            solve_normal_equations(xtx, xty)
        }
    }
}

/// Calls `visit` with every k-subset of `0..n`, in lexicographic order.
fn for_each_combination(n: usize, k: usize, mut visit: impl FnMut(&[usize])) {
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        visit(&idx);
        let Some(i) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
#[cfg(not(feature = "linalg"))]
fn solve_normal_equations(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    let scale = a.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= 1e-12 * scale {
            warn!("singular normal equations at column {}", col);
            return Err(ExplainError::InternalError(
                "Coalition matrix is rank deficient; increase n_samples or enable the 'linalg' feature.".to_string(),
            ));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

impl<'a, M: PredictModel> Explainer for KernelExplainer<'a, M> {
    fn explain(self) -> Result<(Vec<Explanation>, Vec<f64>)> {
        info!(
            "kernel SHAP: explaining '{}' for {} rows against {} sample rows",
            self.base.target_feature_name(),
            self.base.inputs().nrows(),
            self.base.sample().nrows()
        );
        let expected_values = self.base.expected_values()?;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let row_attributions = self
            .base
            .inputs()
            .values()
            .rows()
            .into_iter()
            .map(|row| self.shap_values(&row.to_owned(), &expected_values, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        let explanations = self.base.finish(row_attributions)?;
        info!("kernel SHAP: produced {} explanations", explanations.len());
        Ok((explanations, expected_values))
    }
}
