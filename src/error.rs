//! Error types for the morphview pipeline

use thiserror::Error;

/// Result type alias for morphview operations
pub type Result<T> = std::result::Result<T, MorphError>;

/// Main error type for the morphview pipeline
#[derive(Error, Debug)]
pub enum MorphError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Columns not found: {0}")]
    ColumnsNotFound(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl From<polars::error::PolarsError> for MorphError {
    fn from(err: polars::error::PolarsError) -> Self {
        MorphError::DataError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MorphError {
    fn from(err: ndarray::ShapeError) -> Self {
        MorphError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MorphError::DataError("bad frame".to_string());
        assert_eq!(err.to_string(), "Data error: bad frame");
    }

    #[test]
    fn test_columns_not_found_lists_names() {
        let err = MorphError::ColumnsNotFound("Alpha, Beta".to_string());
        assert!(err.to_string().contains("Alpha"));
        assert!(err.to_string().contains("Beta"));
    }
}
