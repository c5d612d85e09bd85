//! # mimic-classifier
//!
//! Malignancy classifier for the MIMIC-II indwelling arterial catheter
//! cohort, with a strict split between fitting and inference.
//!
//! ## Core Design Principles
//!
//! - **Fit/Transform Separation**: every stateful step has an unfitted
//!   configuration and a fitted counterpart (`Cleaner` → `FittedCleaner`,
//!   `Svc` → `FittedSvc`). Only fitted types transform or predict.
//! - **Plain Serializable Parameters**: fitted components expose their learned
//!   state as `*Params` structs; artifacts wrap them in a versioned envelope.
//! - **Replayable Preprocessing**: inference rows go through the exact
//!   cleaner → imputer → reattacher → scaler → reattacher chain captured at
//!   training time.
//! - **Explicit Seeds**: splitting, SMOTE and cross-validation shuffling all
//!   take a seed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mimic_classifier::config::Config;
//! use mimic_classifier::dataset::load_csv;
//! use mimic_classifier::workflow::train_and_save;
//! use std::path::Path;
//!
//! let table = load_csv("full_cohort_data.csv")?;
//! let outcome = train_and_save(&table, &Config::default(), Path::new("artifacts"))?;
//! for report in outcome.reports() {
//!     println!("{}\n{}", report.name, report.evaluation);
//! }
//! # Ok::<(), mimic_classifier::Error>(())
//! ```
//!
//! ## Module Structure
//!
//! - `dataset` — raw `Table`, numeric `Frame`, CSV loader, seeded train/test split
//! - `preprocessing` — cleaner, KNN imputer, min-max scaler, column reattacher
//! - `model` — SMO-based support-vector classifier and grid search
//! - `resampling` — SMOTE oversampling
//! - `metrics` — confusion matrix and classification report
//! - `pipeline` — fitted preprocessing chain and `Predictor`
//! - `persistence` — versioned artifact files
//! - `config` — TOML run configuration
//! - `workflow` — end-to-end training experiments

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod preprocessing;
pub mod resampling;
pub mod serialization;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{FittedSvc, InferenceModel, Svc};
pub use pipeline::{FittedPreprocessor, Predictor};
