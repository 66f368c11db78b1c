// src/utils/prepare.rs
use crate::core::{ExplainError, Frame, Result};
use crate::traits::PredictModel;
use log::debug;

/// Rows aligned with a model's input features, plus the resolved target.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub inputs: Frame,
    pub sample: Frame,
    pub feature_cols: Vec<String>,
    pub target_feature_name: String,
}

/// Aligns `inputs` and `sample` with the model's input columns and resolves `target`.
///
/// Both frames are projected onto the input feature columns in config order,
/// so extra columns are dropped. Neither frame may be empty. `target` may
/// name an output feature either by its name or by its column; the column is
/// returned.
pub fn prepare_data<M: PredictModel>(
    model: &M,
    inputs: &Frame,
    sample: &Frame,
    target: &str,
) -> Result<PreparedData> {
    let config = model.config();
    let feature_cols: Vec<String> = config
        .input_features
        .iter()
        .map(|f| f.column().to_string())
        .collect();
    if feature_cols.is_empty() {
        return Err(ExplainError::InvalidInput(
            "Model config declares no input features.".to_string(),
        ));
    }

    let target_feature_name = config
        .output_features
        .iter()
        .find(|f| f.name == target || f.column() == target)
        .map(|f| f.column().to_string())
        .ok_or_else(|| ExplainError::UnknownTarget(target.to_string()))?;

    if inputs.is_empty() {
        return Err(ExplainError::InvalidInput(
            "Input rows cannot be empty.".to_string(),
        ));
    }
    if sample.is_empty() {
        return Err(ExplainError::InvalidInput(
            "Sample rows cannot be empty.".to_string(),
        ));
    }

    let inputs = inputs.select(&feature_cols)?;
    let sample = sample.select(&feature_cols)?;
    debug!(
        "prepared {} input rows and {} sample rows over {} features for target '{}'",
        inputs.nrows(),
        sample.nrows(),
        feature_cols.len(),
        target_feature_name
    );

    Ok(PreparedData {
        inputs,
        sample,
        feature_cols,
        target_feature_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureConfig, ModelConfig, TrainingSetMetadata};
    use crate::core::Dataset;

    struct ConfigOnly {
        config: ModelConfig,
        metadata: TrainingSetMetadata,
    }

    impl PredictModel for ConfigOnly {
        fn config(&self) -> &ModelConfig {
            &self.config
        }
        fn training_set_metadata(&self) -> &TrainingSetMetadata {
            &self.metadata
        }
        fn predict(&self, instances: &Dataset, _target: &str) -> Result<Dataset> {
            Ok(Dataset::zeros((instances.nrows(), 1)))
        }
    }

    fn model() -> ConfigOnly {
        ConfigOnly {
            config: ModelConfig {
                input_features: vec![
                    FeatureConfig::new("x2", "number"),
                    FeatureConfig::new("x1", "number"),
                ],
                output_features: vec![FeatureConfig::new("price", "number").with_column("price_usd")],
            },
            metadata: TrainingSetMetadata::default(),
        }
    }

    #[test]
    fn aligns_columns_and_resolves_alias() -> Result<()> {
        let inputs = Frame::from_rows(&["x1", "extra", "x2"], 1, vec![1.0, 9.0, 2.0])?;
        let sample = Frame::from_rows(&["x2", "x1"], 2, vec![0.0, 0.5, 1.0, 1.5])?;

        let prepared = prepare_data(&model(), &inputs, &sample, "price")?;
        assert_eq!(prepared.feature_cols, vec!["x2".to_string(), "x1".to_string()]);
        assert_eq!(prepared.inputs.values().row(0).to_vec(), vec![2.0, 1.0]);
        assert_eq!(prepared.sample.nrows(), 2);
        assert_eq!(prepared.target_feature_name, "price_usd");

        let by_column = prepare_data(&model(), &inputs, &sample, "price_usd")?;
        assert_eq!(by_column.target_feature_name, "price_usd");
        Ok(())
    }

    #[test]
    fn unknown_target_fails() -> Result<()> {
        let rows = Frame::from_rows(&["x1", "x2"], 1, vec![1.0, 2.0])?;
        let err = prepare_data(&model(), &rows, &rows, "volume").unwrap_err();
        assert!(matches!(err, ExplainError::UnknownTarget(ref t) if t == "volume"));
        Ok(())
    }

    #[test]
    fn missing_input_column_fails() -> Result<()> {
        let inputs = Frame::from_rows(&["x1"], 1, vec![1.0])?;
        let sample = Frame::from_rows(&["x1", "x2"], 1, vec![1.0, 2.0])?;
        let err = prepare_data(&model(), &inputs, &sample, "price").unwrap_err();
        assert!(matches!(err, ExplainError::MissingColumn(ref c) if c == "x2"));
        Ok(())
    }

    #[test]
    fn empty_inputs_fail() -> Result<()> {
        let inputs = Frame::from_rows(&["x1", "x2"], 0, Vec::new())?;
        let sample = Frame::from_rows(&["x1", "x2"], 1, vec![1.0, 2.0])?;
        let err = prepare_data(&model(), &inputs, &sample, "price").unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput(ref msg) if msg.contains("Input rows")));
        Ok(())
    }

    #[test]
    fn empty_sample_fails() -> Result<()> {
        let inputs = Frame::from_rows(&["x1", "x2"], 1, vec![1.0, 2.0])?;
        let sample = Frame::from_rows(&["x1", "x2"], 0, Vec::new())?;
        assert!(matches!(
            prepare_data(&model(), &inputs, &sample, "price"),
            Err(ExplainError::InvalidInput(_))
        ));
        Ok(())
    }
}
