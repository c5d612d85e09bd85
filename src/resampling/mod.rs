//! Resampling of imbalanced training sets.

pub mod smote;

pub use smote::Smote;

use thiserror::Error;

/// Error type for resampling.
#[derive(Debug, Error)]
pub enum ResamplingError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{rows} feature rows but {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("label {0} is not a binary class")]
    InvalidLabel(usize),
    #[error("labels contain a single class; nothing to balance")]
    SingleClass,
    #[error("feature matrix contains non-finite values")]
    NonFinite,
    #[error("class {class} has {count} samples, too few for k_neighbors={k_neighbors}")]
    TooFewSamples {
        class: usize,
        count: usize,
        k_neighbors: usize,
    },
}
