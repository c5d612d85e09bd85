//! Data preprocessing transformers for the cohort pipeline.
//!
//! Every stateful step follows the same fit/transform split:
//!
//! - [`Transformer`]: unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: fitted transformer ready for inference, with
//!   serializable `*Params`
//!
//! # Available Transformers
//!
//! - [`Cleaner`]: recode the categorical column, drop unused columns, move the
//!   renamed label last
//! - [`KnnImputer`]: fill missing cells from the K nearest rows
//! - [`MinMaxScaler`]: scale each column to [0, 1] or a custom range
//! - [`ColumnReattacher`]: stateless; restores column names on a bare matrix
//!
//! # Example
//!
//! ```
//! use mimic_classifier::preprocessing::{
//!     FittedTransformer, KnnImputer, MinMaxScaler, Transformer,
//! };
//! use ndarray::array;
//!
//! let raw = array![[1.0, 10.0], [f64::NAN, 20.0], [3.0, 30.0]];
//! let imputed = KnnImputer::new(2).fit_transform(&raw)?;
//! let scaler = MinMaxScaler::new().fit(&imputed)?;
//! let scaled = scaler.transform(&imputed)?;
//! assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));
//! # Ok::<(), mimic_classifier::preprocessing::PreprocessingError>(())
//! ```

pub mod cleaner;
pub mod error;
pub mod imputation;
pub mod reattach;
pub mod scaling;
pub mod traits;

// Re-export main types
pub use cleaner::{
    CleanResult, Cleaner, CleanerConfig, CleanerParams, FittedCleaner, HandleUnknown,
};
pub use error::PreprocessingError;
pub use imputation::{FittedKnnImputer, KnnImputer, KnnImputerParams, KnnWeights};
pub use reattach::ColumnReattacher;
pub use scaling::{FittedMinMaxScaler, MinMaxScaler, MinMaxScalerConfig, MinMaxScalerParams};
pub use traits::{FittedTransformer, Transformer};

/// Column name for error messages, falling back to `#<index>`.
pub(crate) fn feature_label(names: Option<&[String]>, idx: usize) -> String {
    names
        .and_then(|n| n.get(idx))
        .cloned()
        .unwrap_or_else(|| format!("#{idx}"))
}
