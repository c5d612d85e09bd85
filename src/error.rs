//! Crate-level error type.

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::model::ModelError;
use crate::persistence::PersistenceError;
use crate::preprocessing::PreprocessingError;
use crate::resampling::ResamplingError;
use thiserror::Error;

/// Any failure of the load → preprocess → train → persist → predict chain.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Resampling(#[from] ResamplingError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot write report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
