//! Error types for preprocessing operations.

use thiserror::Error;

/// Error type for preprocessing operations.
///
/// Variants fall into three groups: schema errors (a column is absent, of the
/// wrong type, or in the wrong place), data-quality errors (a column that
/// cannot be imputed or scaled), and parameter / shape errors.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// A required column is absent from the input.
    #[error("missing column `{column}`")]
    MissingColumn { column: String },
    /// A column that must be numeric still holds text after cleaning.
    #[error("column `{column}` is not numeric")]
    NonNumericColumn { column: String },
    /// A categorical value has no code in the configured mapping.
    #[error("unknown category `{value}` in column `{column}`")]
    UnknownCategory { column: String, value: String },
    /// A column has no observed value to learn from.
    #[error("column `{column}` has no observed values")]
    EmptyColumn { column: String },
    /// A column is constant, so its min-max range is zero.
    #[error("column `{column}` is constant ({value}); min-max range is zero")]
    ZeroRange { column: String, value: f64 },
    /// Data contains missing or non-finite values where none are allowed.
    #[error("Missing values: {0}")]
    MissingValues(String),
    /// The number of names does not match the matrix width.
    #[error("{got} column names supplied for a matrix with {expected} columns")]
    ColumnCountMismatch { expected: usize, got: usize },
    /// A column name appears twice.
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),
    /// Cleaned columns are not in the order recorded at fit time.
    #[error("column order mismatch at position {position}: expected `{expected}`, got `{got}`")]
    ColumnOrderMismatch {
        position: usize,
        expected: String,
        got: String,
    },
    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
    /// Invalid hyperparameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<bincode::Error> for PreprocessingError {
    fn from(err: bincode::Error) -> Self {
        PreprocessingError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_category() {
        let err = PreprocessingError::UnknownCategory {
            column: "service_unit".to_string(),
            value: "CCU".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown category `CCU` in column `service_unit`"
        );
    }

    #[test]
    fn test_error_display_zero_range() {
        let err = PreprocessingError::ZeroRange {
            column: "aline_flg".to_string(),
            value: 1.0,
        };
        assert!(err.to_string().contains("aline_flg"));
        assert!(err.to_string().contains("range is zero"));
    }

    #[test]
    fn test_error_display_feature_mismatch() {
        let err = PreprocessingError::FeatureMismatch {
            expected_features: 5,
            got_features: 3,
        };
        assert!(err.to_string().contains("Feature mismatch"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PreprocessingError = io_err.into();
        assert!(matches!(err, PreprocessingError::IoError(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let bincode_result: Result<String, bincode::Error> = bincode::deserialize(bad_bytes);
        if let Err(e) = bincode_result {
            let err: PreprocessingError = e.into();
            assert!(matches!(err, PreprocessingError::SerializationError(_)));
        }
    }
}
