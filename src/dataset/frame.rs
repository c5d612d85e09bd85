//! All-numeric labelled matrix.

use super::table::same_value;
use super::DatasetError;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::collections::HashSet;

/// Tolerance used when reading 0/1 labels back out of a float matrix.
const LABEL_TOLERANCE: f64 = 1e-9;

/// A numeric matrix whose columns carry names.
///
/// Produced by the cleaner and rebuilt by the reattacher after each stage that
/// returns a bare matrix (imputer, scaler).
///
/// `==` compares cells as `f64`, so a frame with a `NaN` never equals itself;
/// [`Frame::same_cells`] treats missing cells as matching.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    data: Array2<f64>,
}

impl Frame {
    /// Build a frame, checking that every column has a unique name.
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self, DatasetError> {
        if columns.len() != data.ncols() {
            return Err(DatasetError::WidthMismatch {
                names: columns.len(),
                width: data.ncols(),
            });
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { columns, data })
    }

    /// Build a frame whose names were already validated by the caller.
    pub(crate) fn from_parts(columns: Vec<String>, data: Array2<f64>) -> Self {
        debug_assert_eq!(columns.len(), data.ncols());
        Self { columns, data }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.data.column(i))
    }

    /// Number of `NaN` cells.
    pub fn n_missing(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Same column names and shape, with `NaN` cells matching each other.
    pub fn same_cells(&self, other: &Frame) -> bool {
        self.columns == other.columns
            && self.data.dim() == other.data.dim()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| same_value(*a, *b))
    }

    /// Frame without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Frame, DatasetError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        let keep: Vec<usize> = (0..self.n_columns()).filter(|&i| i != index).collect();
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        Ok(Frame {
            columns,
            data: self.data.select(Axis(1), &keep),
        })
    }

    /// Frame with one extra column appended on the right.
    pub fn with_column(&self, name: &str, values: Array1<f64>) -> Result<Frame, DatasetError> {
        if self.column_index(name).is_some() {
            return Err(DatasetError::DuplicateColumn(name.to_string()));
        }
        if values.len() != self.n_rows() {
            return Err(DatasetError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_rows(),
                got: values.len(),
            });
        }
        let mut data = Array2::zeros((self.n_rows(), self.n_columns() + 1));
        data.slice_mut(ndarray::s![.., ..self.n_columns()])
            .assign(&self.data);
        data.column_mut(self.n_columns()).assign(&values);

        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        Ok(Frame { columns, data })
    }

    /// Split into the feature matrix (every column but `label`) and 0/1 labels.
    pub fn split_xy(&self, label: &str) -> Result<(Array2<f64>, Vec<usize>), DatasetError> {
        let index = self
            .column_index(label)
            .ok_or_else(|| DatasetError::MissingColumn(label.to_string()))?;

        let labels = self
            .data
            .column(index)
            .iter()
            .enumerate()
            .map(|(row, &value)| {
                if value.abs() < LABEL_TOLERANCE {
                    Ok(0)
                } else if (value - 1.0).abs() < LABEL_TOLERANCE {
                    Ok(1)
                } else {
                    Err(DatasetError::InvalidLabel {
                        column: label.to_string(),
                        row,
                        value,
                    })
                }
            })
            .collect::<Result<Vec<usize>, _>>()?;

        let features = self.drop_column(label)?;
        Ok((features.data, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Frame {
        Frame::new(
            vec!["age".into(), "bmi".into(), "cancer".into()],
            array![[50.0, 21.0, 0.0], [61.0, 30.5, 1.0], [72.0, 25.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_frame_rejects_width_mismatch() {
        let result = Frame::new(vec!["a".into()], array![[1.0, 2.0]]);
        assert!(matches!(
            result,
            Err(DatasetError::WidthMismatch { names: 1, width: 2 })
        ));
    }

    #[test]
    fn test_split_xy() {
        let (x, y) = sample().split_xy("cancer").unwrap();
        assert_eq!(x, array![[50.0, 21.0], [61.0, 30.5], [72.0, 25.0]]);
        assert_eq!(y, vec![0, 1, 0]);
    }

    #[test]
    fn test_split_xy_rejects_non_binary_label() {
        let frame = Frame::new(vec!["x".into(), "y".into()], array![[1.0, 0.5]]).unwrap();
        assert!(matches!(
            frame.split_xy("y"),
            Err(DatasetError::InvalidLabel { row: 0, .. })
        ));
    }

    #[test]
    fn test_drop_and_append_column() {
        let frame = sample();
        let dropped = frame.drop_column("bmi").unwrap();
        assert_eq!(dropped.columns(), &["age".to_string(), "cancer".to_string()]);
        assert_eq!(dropped.data().column(1).to_vec(), vec![0.0, 1.0, 0.0]);

        let extended = dropped
            .with_column("bmi", Array1::from(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(extended.column("bmi").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(extended.with_column("age", Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_same_cells_with_missing_values() {
        let frame = Frame::new(
            vec!["age".into(), "cancer".into()],
            array![[f64::NAN, 0.0], [61.0, 1.0]],
        )
        .unwrap();
        assert_ne!(frame, frame.clone());
        assert!(frame.same_cells(&frame.clone()));

        let filled = Frame::new(frame.columns().to_vec(), array![[55.0, 0.0], [61.0, 1.0]]).unwrap();
        assert!(!frame.same_cells(&filled));
        assert!(!frame.same_cells(&frame.drop_column("age").unwrap()));
    }
}
