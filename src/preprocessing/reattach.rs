//! Restores column identity on a bare matrix.
//!
//! The imputer and the scaler work on `Array2<f64>` and forget column names;
//! [`ColumnReattacher`] pairs the matrix with the ordered list recorded at
//! fit time. It has no fitted state.

use crate::dataset::Frame;
use crate::preprocessing::error::PreprocessingError;
use ndarray::Array2;
use std::collections::HashSet;

/// Stateless step that labels matrix columns with an ordered name list.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnReattacher;

impl ColumnReattacher {
    pub fn new() -> Self {
        Self
    }

    /// Attach `columns` to `data`, in order.
    ///
    /// # Errors
    /// [`PreprocessingError::ColumnCountMismatch`] when the name count differs
    /// from the matrix width, [`PreprocessingError::DuplicateColumn`] when a
    /// name repeats.
    pub fn transform(
        &self,
        data: Array2<f64>,
        columns: &[String],
    ) -> Result<Frame, PreprocessingError> {
        if columns.len() != data.ncols() {
            return Err(PreprocessingError::ColumnCountMismatch {
                expected: data.ncols(),
                got: columns.len(),
            });
        }
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(dup) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(PreprocessingError::DuplicateColumn(dup.clone()));
        }
        Ok(Frame::from_parts(columns.to_vec(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reattach_labels_columns_in_order() {
        let frame = ColumnReattacher
            .transform(array![[1.0, 0.0], [2.0, 1.0]], &names(&["age", "cancer"]))
            .unwrap();
        assert_eq!(frame.columns(), &["age", "cancer"]);
        assert_eq!(frame.column("cancer").unwrap().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_reattach_count_mismatch() {
        let err = ColumnReattacher
            .transform(array![[1.0, 0.0]], &names(&["age"]))
            .unwrap_err();
        assert!(matches!(
            err,
            PreprocessingError::ColumnCountMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_reattach_duplicate_name() {
        let err = ColumnReattacher
            .transform(array![[1.0, 0.0]], &names(&["age", "age"]))
            .unwrap_err();
        assert!(matches!(err, PreprocessingError::DuplicateColumn(ref name) if name == "age"));
    }
}
