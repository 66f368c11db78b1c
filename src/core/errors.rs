// src/core/errors.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("Missing Value: {0}")]
    MissingValue(String),

    #[error("Model Prediction Error: {0}")]
    ModelPredictionError(String),

    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Ndarray Error: {0}")]
    NdarrayError(#[from] ndarray::ShapeError),

    /// The target does not name any output feature of the model.
    #[error("Unknown Target: '{0}' is not an output feature of the model")]
    UnknownTarget(String),

    /// The target exists but its type cannot be attributed (only binary, category and number can).
    #[error("Unsupported Target: '{name}' has type '{feature_type}'")]
    UnsupportedTarget { name: String, feature_type: String },

    #[error("Missing Column: '{0}' is required by the model but absent from the rows")]
    MissingColumn(String),

    #[error("Config Error: {0}")]
    Config(#[from] serde_json::Error),
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, ExplainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_errors_convert() {
        let err: ExplainError = ndarray::Array2::<f64>::from_shape_vec((2, 2), vec![1.0])
            .unwrap_err()
            .into();
        assert!(matches!(err, ExplainError::NdarrayError(_)));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = ExplainError::UnsupportedTarget {
            name: "caption".to_string(),
            feature_type: "text".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported Target: 'caption' has type 'text'");
    }
}
