//! Classifiers and model selection.
//!
//! - [`Svc`] / [`FittedSvc`]: kernel support-vector classifier solved with SMO
//! - [`GridSearch`] / [`FittedGridSearch`]: exhaustive `C` × `gamma` search
//!   with stratified k-fold cross-validation
//!
//! Fitted models implement [`InferenceModel`], which is all the
//! [`Predictor`](crate::pipeline::Predictor) needs.

pub mod grid_search;
pub mod kernel;
pub mod svc;

pub use grid_search::{
    linspace, stratified_k_fold, CrossValidation, FittedGridSearch, GridSearch, ParamGrid,
    SearchSummary, TrialResult,
};
pub use kernel::{Gamma, Kernel, KernelKind};
pub use svc::{ClassWeight, FittedSvc, Svc, SvcConfig, SvcParams};

use ndarray::Array2;
use thiserror::Error;

/// Error type for training and inference.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Empty data: {0}")]
    EmptyData(String),
    #[error("{rows} feature rows but {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
    /// Training labels contain only one class.
    #[error("training labels contain a single class ({0})")]
    SingleClass(usize),
    /// A label other than 0 or 1.
    #[error("label {0} is not a binary class")]
    InvalidLabel(usize),
    #[error("feature matrix contains non-finite values")]
    NonFinite,
    /// A class has fewer members than cross-validation folds.
    #[error("class {class} has {count} samples, fewer than {n_folds} folds")]
    TooFewSamples {
        class: usize,
        count: usize,
        n_folds: usize,
    },
}

/// A fitted binary classifier.
pub trait InferenceModel {
    /// Predict a 0/1 class for every row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError>;

    /// Number of features seen during fit.
    fn n_features_in(&self) -> usize;
}

/// Shared validation for a labelled training set.
pub(crate) fn check_training_data(x: &Array2<f64>, y: &[usize]) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyData(format!(
            "cannot fit on a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if let Some(&label) = y.iter().find(|&&label| label > 1) {
        return Err(ModelError::InvalidLabel(label));
    }
    if !x.iter().all(|v| v.is_finite()) {
        return Err(ModelError::NonFinite);
    }
    if y.iter().all(|&label| label == y[0]) {
        return Err(ModelError::SingleClass(y[0]));
    }
    Ok(())
}
