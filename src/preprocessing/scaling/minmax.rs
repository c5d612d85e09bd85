//! Min-Max Scaler.
//!
//! Transforms features by scaling each feature to a given range (default [0, 1]).
//!
//! The transformation is given by:
//! ```text
//! X_scaled = (X - X_min) / (X_max - X_min) * (max - min) + min
//! ```
//!
//! Values outside the fit-time range extrapolate; nothing is clipped.
//!
//! # Example
//! ```
//! use mimic_classifier::preprocessing::{FittedTransformer, MinMaxScaler, Transformer};
//! use ndarray::array;
//!
//! let data = array![[0.0, 1.0], [1.0, 3.0]];
//! let fitted = MinMaxScaler::new().with_range(-1.0, 1.0).fit(&data)?;
//! assert_eq!(fitted.transform(&data)?, array![[-1.0, -1.0], [1.0, 1.0]]);
//! # Ok::<(), mimic_classifier::preprocessing::PreprocessingError>(())
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::feature_label;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Configuration for MinMaxScaler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerConfig {
    /// Minimum value of the target range.
    pub min: f64,
    /// Maximum value of the target range.
    pub max: f64,
}

impl Default for MinMaxScalerConfig {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl MinMaxScalerConfig {
    fn validate(&self) -> Result<(), PreprocessingError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return Err(PreprocessingError::InvalidParameter(format!(
                "target range [{}, {}] must be finite with max > min",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Serializable parameters for a fitted MinMaxScaler.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinMaxScalerParams {
    /// Configuration options.
    pub config: MinMaxScalerConfig,
    /// Minimum of each feature.
    pub min_: Vec<f64>,
    /// Maximum of each feature.
    pub max_: Vec<f64>,
    /// Number of features seen during fit.
    pub n_features: usize,
    pub feature_names: Option<Vec<String>>,
}

/// MinMaxScaler transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct MinMaxScaler {
    config: MinMaxScalerConfig,
    feature_names: Option<Vec<String>>,
}

impl MinMaxScaler {
    /// Create a new MinMaxScaler with default range [0, 1].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target range for scaling. Checked at fit time.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.config.min = min;
        self.config.max = max;
        self
    }

    /// Attach column names; they only appear in error messages.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn config(&self) -> MinMaxScalerConfig {
        self.config
    }
}

fn ensure_finite(data: &Array2<f64>, names: Option<&[String]>) -> Result<(), PreprocessingError> {
    match data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), value)) => Err(PreprocessingError::MissingValues(format!(
            "non-finite value {value} in column `{}` at row {row}",
            feature_label(names, col)
        ))),
        None => Ok(()),
    }
}

impl Transformer for MinMaxScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = MinMaxScalerParams;
    type Fitted = FittedMinMaxScaler;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        let (rows, cols) = data.dim();

        if rows == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit MinMaxScaler on empty data".to_string(),
            ));
        }
        self.config.validate()?;
        if let Some(names) = &self.feature_names {
            if names.len() != cols {
                return Err(PreprocessingError::ColumnCountMismatch {
                    expected: cols,
                    got: names.len(),
                });
            }
        }
        ensure_finite(data, self.feature_names.as_deref())?;

        let min_ = data.fold_axis(Axis(0), f64::INFINITY, |acc, &x| acc.min(x));
        let max_ = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &x| acc.max(x));

        for (col, (&lo, &hi)) in min_.iter().zip(max_.iter()).enumerate() {
            if hi == lo {
                return Err(PreprocessingError::ZeroRange {
                    column: feature_label(self.feature_names.as_deref(), col),
                    value: lo,
                });
            }
        }

        Ok(FittedMinMaxScaler {
            config: self.config,
            min_,
            max_,
            feature_names: self.feature_names.clone(),
        })
    }
}

/// Fitted MinMaxScaler ready for inference.
#[derive(Clone, Debug)]
pub struct FittedMinMaxScaler {
    config: MinMaxScalerConfig,
    min_: Array1<f64>,
    max_: Array1<f64>,
    feature_names: Option<Vec<String>>,
}

impl FittedMinMaxScaler {
    /// Get the minimum values for each feature.
    pub fn min(&self) -> &Array1<f64> {
        &self.min_
    }

    /// Get the maximum values for each feature.
    pub fn max(&self) -> &Array1<f64> {
        &self.max_
    }

    /// Get the data range (max - min) for each feature.
    pub fn data_range(&self) -> Array1<f64> {
        &self.max_ - &self.min_
    }

    pub fn n_features_in(&self) -> usize {
        self.min_.len()
    }

    fn check_width(&self, cols: usize) -> Result<(), PreprocessingError> {
        if cols != self.n_features_in() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.n_features_in(),
                got_features: cols,
            });
        }
        Ok(())
    }
}

impl FittedTransformer for FittedMinMaxScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = MinMaxScalerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        self.check_width(data.ncols())?;
        ensure_finite(data, self.feature_names.as_deref())?;

        let (lo, hi) = (self.config.min, self.config.max);
        let mut result = data.clone();
        for (mut column, (&min, &max)) in result
            .columns_mut()
            .into_iter()
            .zip(self.min_.iter().zip(self.max_.iter()))
        {
            let range = max - min;
            column.mapv_inplace(|x| (x - min) / range * (hi - lo) + lo);
        }
        Ok(result)
    }

    fn inverse_transform(&self, data: &Self::Output) -> Result<Self::Input, PreprocessingError> {
        self.check_width(data.ncols())?;

        let (lo, hi) = (self.config.min, self.config.max);
        let mut result = data.clone();
        for (mut column, (&min, &max)) in result
            .columns_mut()
            .into_iter()
            .zip(self.min_.iter().zip(self.max_.iter()))
        {
            let range = max - min;
            column.mapv_inplace(|x| (x - lo) / (hi - lo) * range + min);
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        MinMaxScalerParams {
            config: self.config,
            min_: self.min_.to_vec(),
            max_: self.max_.to_vec(),
            n_features: self.n_features_in(),
            feature_names: self.feature_names.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        params.config.validate()?;
        if params.min_.len() != params.n_features || params.max_.len() != params.n_features {
            return Err(PreprocessingError::SerializationError(format!(
                "scaler bounds have {} / {} entries for {} features",
                params.min_.len(),
                params.max_.len(),
                params.n_features
            )));
        }
        if let Some(col) = params
            .min_
            .iter()
            .zip(params.max_.iter())
            .position(|(lo, hi)| !lo.is_finite() || !hi.is_finite() || hi <= lo)
        {
            return Err(PreprocessingError::SerializationError(format!(
                "invalid bounds for column `{}`",
                feature_label(params.feature_names.as_deref(), col)
            )));
        }

        Ok(Self {
            config: params.config,
            min_: Array1::from(params.min_),
            max_: Array1::from(params.max_),
            feature_names: params.feature_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_data() -> Array2<f64> {
        array![[0.0, 1.0], [0.0, 1.0], [1.0, 3.0]]
    }

    #[test]
    fn test_minmax_scaler_fit() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();

        assert_eq!(fitted.min(), &array![0.0, 1.0]);
        assert_eq!(fitted.max(), &array![1.0, 3.0]);
        assert_eq!(fitted.data_range(), array![1.0, 2.0]);
        assert_eq!(fitted.n_features_in(), 2);
    }

    #[test]
    fn test_minmax_scaler_transform() {
        let data = create_test_data();
        let transformed = MinMaxScaler::new().fit_transform(&data).unwrap();

        // Both columns map to [0, 0, 1]
        assert_eq!(transformed, array![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0]]);
        assert!(transformed.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_minmax_scaler_extrapolates_outside_fit_range() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();
        let transformed = fitted.transform(&array![[2.0, 0.0]]).unwrap();
        assert_abs_diff_eq!(transformed[[0, 0]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(transformed[[0, 1]], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_minmax_scaler_inverse_transform() {
        let data = array![[12.5, -3.0], [40.0, 7.25], [18.0, 0.5]];
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        let transformed = fitted.transform(&data).unwrap();
        let recovered = fitted.inverse_transform(&transformed).unwrap();

        for (o, r) in data.iter().zip(recovered.iter()) {
            assert_abs_diff_eq!(*o, *r, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_minmax_scaler_custom_range() {
        let fitted = MinMaxScaler::new()
            .with_range(-1.0, 1.0)
            .fit(&create_test_data())
            .unwrap();
        let transformed = fitted.transform(&create_test_data()).unwrap();
        assert_eq!(transformed, array![[-1.0, -1.0], [-1.0, -1.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_minmax_scaler_invalid_range() {
        let result = MinMaxScaler::new()
            .with_range(1.0, 1.0)
            .fit(&create_test_data());
        assert!(matches!(result, Err(PreprocessingError::InvalidParameter(_))));
    }

    #[test]
    fn test_minmax_scaler_zero_range() {
        let data = array![[5.0, 1.0], [5.0, 2.0]];
        let result = MinMaxScaler::new()
            .with_feature_names(vec!["aline_flg".into(), "age".into()])
            .fit(&data);
        assert!(matches!(
            result,
            Err(PreprocessingError::ZeroRange { ref column, value }) if column == "aline_flg" && value == 5.0
        ));
    }

    #[test]
    fn test_minmax_scaler_rejects_missing_values() {
        let data = array![[1.0, f64::NAN], [2.0, 3.0]];
        assert!(matches!(
            MinMaxScaler::new().fit(&data),
            Err(PreprocessingError::MissingValues(_))
        ));

        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();
        assert!(matches!(
            fitted.transform(&array![[f64::NAN, 1.0]]),
            Err(PreprocessingError::MissingValues(_))
        ));
    }

    #[test]
    fn test_minmax_scaler_feature_mismatch() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();
        let result = fitted.transform(&array![[1.0, 2.0, 3.0]]);

        assert!(matches!(
            result,
            Err(PreprocessingError::FeatureMismatch {
                expected_features: 2,
                got_features: 3
            })
        ));
        assert!(matches!(
            fitted.inverse_transform(&array![[1.0, 2.0, 3.0]]),
            Err(PreprocessingError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_minmax_scaler_empty_data() {
        let data = Array2::<f64>::zeros((0, 2));
        assert!(MinMaxScaler::new().fit(&data).is_err());
    }

    #[test]
    fn test_minmax_scaler_serialization() {
        let data = create_test_data();
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        let restored = FittedMinMaxScaler::from_params(fitted.extract_params()).unwrap();
        assert_eq!(
            fitted.transform(&data).unwrap(),
            restored.transform(&data).unwrap()
        );
    }

    #[test]
    fn test_minmax_scaler_rejects_corrupt_params() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();
        let mut params = fitted.extract_params();
        params.max_[1] = params.min_[1];
        assert!(FittedMinMaxScaler::from_params(params).is_err());
    }

    #[test]
    fn test_minmax_scaler_save_load_file() {
        let data = create_test_data();
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minmax.bin");
        fitted.save_to_file(&path).unwrap();

        let loaded = FittedMinMaxScaler::load_from_file(&path).unwrap();
        assert_eq!(loaded.n_features_in(), fitted.n_features_in());
        assert_eq!(
            loaded.transform(&data).unwrap(),
            fitted.transform(&data).unwrap()
        );
    }
}
