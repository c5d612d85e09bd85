//! Imputation transformers for handling missing values.
//!
//! | Transformer | Description |
//! |-------------|-------------|
//! | [`KnnImputer`] | Fill each missing cell from the K nearest rows that observe it |

pub mod knn;

pub use knn::{FittedKnnImputer, KnnImputer, KnnImputerParams, KnnWeights};
