//! K-nearest-neighbours imputer.
//!
//! Each missing cell is replaced by the mean of that column over the K nearest
//! fit-time rows that observe the column. Distances use the NaN-aware
//! euclidean metric: only coordinates present in both rows contribute, and
//! the sum is rescaled by `n_features / n_present`.
//!
//! The fit-time matrix is kept in full; transforms of new rows search it for
//! donors, so the same neighbourhood structure is reused after reload.
//!
//! # Example
//! ```
//! use mimic_classifier::preprocessing::{FittedTransformer, KnnImputer, Transformer};
//! use ndarray::array;
//!
//! let data = array![[1.0, 2.0], [2.0, f64::NAN], [3.0, 6.0]];
//! let imputed = KnnImputer::new(2).fit_transform(&data)?;
//! assert_eq!(imputed[[1, 1]], 4.0);
//! # Ok::<(), mimic_classifier::preprocessing::PreprocessingError>(())
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::feature_label;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Weight function used to combine donor values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnnWeights {
    /// Every donor counts equally.
    #[default]
    Uniform,
    /// Donors are weighted by the inverse of their distance.
    Distance,
}

/// Serializable parameters for a fitted KnnImputer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnnImputerParams {
    pub n_neighbors: usize,
    pub weights: KnnWeights,
    /// Fit-time matrix, row-major, `NaN` for missing cells.
    pub fit_data: Vec<f64>,
    pub n_samples: usize,
    pub n_features: usize,
    /// Column means used when no donor shares a coordinate with the row.
    pub column_means: Vec<f64>,
    pub feature_names: Option<Vec<String>>,
}

/// KnnImputer transformer (unfitted).
#[derive(Clone, Debug)]
pub struct KnnImputer {
    n_neighbors: usize,
    weights: KnnWeights,
    feature_names: Option<Vec<String>>,
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(7)
    }
}

impl KnnImputer {
    /// Create an imputer using `n_neighbors` donors per missing cell.
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            weights: KnnWeights::Uniform,
            feature_names: None,
        }
    }

    pub fn with_weights(mut self, weights: KnnWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Attach column names; they only appear in error messages.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }
}

/// NaN-aware euclidean distance; `None` when the rows share no observed coordinate.
fn nan_euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut present = 0usize;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if !x.is_nan() && !y.is_nan() {
            sum += (x - y) * (x - y);
            present += 1;
        }
    }
    if present == 0 {
        return None;
    }
    Some((sum * a.len() as f64 / present as f64).sqrt())
}

impl Transformer for KnnImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = KnnImputerParams;
    type Fitted = FittedKnnImputer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        let (rows, cols) = data.dim();

        if rows == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit KnnImputer on empty data".to_string(),
            ));
        }
        if self.n_neighbors == 0 {
            return Err(PreprocessingError::InvalidParameter(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != cols {
                return Err(PreprocessingError::ColumnCountMismatch {
                    expected: cols,
                    got: names.len(),
                });
            }
        }
        if let Some(((row, col), value)) = data.indexed_iter().find(|(_, v)| v.is_infinite()) {
            return Err(PreprocessingError::MissingValues(format!(
                "infinite value {value} in column `{}` at row {row}",
                feature_label(self.feature_names.as_deref(), col)
            )));
        }

        let mut column_means = Vec::with_capacity(cols);
        for (col, column) in data.columns().into_iter().enumerate() {
            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(PreprocessingError::EmptyColumn {
                    column: feature_label(self.feature_names.as_deref(), col),
                });
            }
            column_means.push(observed.iter().sum::<f64>() / observed.len() as f64);
        }

        log::debug!(
            "KnnImputer fitted on {} rows x {} columns ({} missing cells)",
            rows,
            cols,
            data.iter().filter(|v| v.is_nan()).count()
        );

        Ok(FittedKnnImputer {
            n_neighbors: self.n_neighbors,
            weights: self.weights,
            fit_data: data.clone(),
            column_means,
            feature_names: self.feature_names.clone(),
        })
    }
}

/// Fitted KnnImputer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedKnnImputer {
    n_neighbors: usize,
    weights: KnnWeights,
    fit_data: Array2<f64>,
    column_means: Vec<f64>,
    feature_names: Option<Vec<String>>,
}

impl FittedKnnImputer {
    /// Number of features seen during fit.
    pub fn n_features_in(&self) -> usize {
        self.fit_data.ncols()
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Column means over observed fit-time values.
    pub fn column_means(&self) -> &[f64] {
        &self.column_means
    }

    fn impute_cell(&self, distances: &[Option<f64>], col: usize) -> f64 {
        let mut donors: Vec<(f64, usize)> = distances
            .iter()
            .enumerate()
            .filter_map(|(row, d)| {
                let value = self.fit_data[[row, col]];
                match d {
                    Some(d) if !value.is_nan() => Some((*d, row)),
                    _ => None,
                }
            })
            .collect();

        if donors.is_empty() {
            return self.column_means[col];
        }

        donors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        donors.truncate(self.n_neighbors);

        match self.weights {
            KnnWeights::Uniform => {
                donors
                    .iter()
                    .map(|&(_, row)| self.fit_data[[row, col]])
                    .sum::<f64>()
                    / donors.len() as f64
            }
            KnnWeights::Distance => {
                // An exact match outweighs everything else.
                let exact: Vec<f64> = donors
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, row)| self.fit_data[[row, col]])
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().sum::<f64>() / exact.len() as f64;
                }
                let (weighted, total) = donors.iter().fold((0.0, 0.0), |(acc, w), &(d, row)| {
                    (acc + self.fit_data[[row, col]] / d, w + 1.0 / d)
                });
                weighted / total
            }
        }
    }
}

impl FittedTransformer for FittedKnnImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = KnnImputerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let cols = data.ncols();

        if cols != self.n_features_in() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.n_features_in(),
                got_features: cols,
            });
        }

        let mut result = data.clone();
        for (row_idx, row) in data.rows().into_iter().enumerate() {
            let missing: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_nan())
                .map(|(c, _)| c)
                .collect();
            if missing.is_empty() {
                continue;
            }

            let distances: Vec<Option<f64>> = self
                .fit_data
                .rows()
                .into_iter()
                .map(|donor| nan_euclidean(row, donor))
                .collect();

            for col in missing {
                result[[row_idx, col]] = self.impute_cell(&distances, col);
            }
        }

        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        KnnImputerParams {
            n_neighbors: self.n_neighbors,
            weights: self.weights,
            fit_data: self.fit_data.iter().copied().collect(),
            n_samples: self.fit_data.nrows(),
            n_features: self.fit_data.ncols(),
            column_means: self.column_means.clone(),
            feature_names: self.feature_names.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.n_neighbors == 0 {
            return Err(PreprocessingError::InvalidParameter(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if params.column_means.len() != params.n_features
            || params.column_means.iter().any(|m| !m.is_finite())
        {
            return Err(PreprocessingError::SerializationError(
                "imputer column means do not match the feature count".to_string(),
            ));
        }
        if let Some(names) = &params.feature_names {
            if names.len() != params.n_features {
                return Err(PreprocessingError::ColumnCountMismatch {
                    expected: params.n_features,
                    got: names.len(),
                });
            }
        }
        let fit_data = Array2::from_shape_vec((params.n_samples, params.n_features), params.fit_data)
            .map_err(|e| PreprocessingError::SerializationError(e.to_string()))?;

        Ok(Self {
            n_neighbors: params.n_neighbors,
            weights: params.weights,
            fit_data,
            column_means: params.column_means,
            feature_names: params.feature_names,
        })
    }
}
