//! Fitted preprocessing chain and the inference path.
//!
//! [`FittedPreprocessor`] replays cleaner → imputer → reattacher → scaler →
//! reattacher exactly as fitted, and [`Predictor`] puts a model behind it so
//! raw rows in the loader's schema go straight to 0/1 predictions.
//!
//! # Example
//! ```no_run
//! use mimic_classifier::dataset::load_csv;
//! use mimic_classifier::pipeline::Predictor;
//!
//! let predictor = Predictor::load(
//!     "MIMIC_Cancer_Classifier_Preprocessing.bin",
//!     "MIMIC_Cancer_Classifier_Model.bin",
//! )?;
//! let raw = load_csv("full_cohort_data.csv")?;
//! let predictions = predictor.predict(&raw)?;
//! # Ok::<(), mimic_classifier::Error>(())
//! ```

use crate::config::PreprocessingConfig;
use crate::dataset::{Frame, Table};
use crate::error::Result;
use crate::model::{FittedSvc, InferenceModel, ModelError};
use crate::persistence::{self, PersistenceError, PreprocessingBundle};
use crate::preprocessing::{
    CleanResult, Cleaner, ColumnReattacher, FittedCleaner, FittedKnnImputer,
    FittedMinMaxScaler, FittedTransformer, KnnImputer, MinMaxScaler, PreprocessingError,
    Transformer,
};
use ndarray::Array1;
use std::path::Path;

/// Cleaner, imputer and scaler fitted together, plus the column order they
/// were fitted on.
#[derive(Clone, Debug)]
pub struct FittedPreprocessor {
    cleaner: FittedCleaner,
    imputer: FittedKnnImputer,
    scaler: FittedMinMaxScaler,
    reattacher: ColumnReattacher,
    column_order: Vec<String>,
    label_column: String,
}

impl FittedPreprocessor {
    /// Fit every stage on `table` and return the normalised frame with it.
    ///
    /// The table must contain the label column.
    pub fn fit(
        table: &Table,
        config: &PreprocessingConfig,
    ) -> Result<(Self, Frame), PreprocessingError> {
        let cleaner = Cleaner::new(config.cleaner.clone()).fit(table)?;
        let label_column = config.cleaner.renamed_label.clone();

        let cleaned = match cleaner.transform(table)? {
            CleanResult::Cleaned(frame) => frame,
            CleanResult::NoLabelPresent(_) => {
                return Err(PreprocessingError::MissingColumn {
                    column: config.cleaner.label_column.clone(),
                })
            }
        };
        let column_order = cleaned.columns().to_vec();
        log::info!(
            "Cleaned data: {} rows x {} columns, {} missing cells",
            cleaned.n_rows(),
            cleaned.n_columns(),
            cleaned.n_missing()
        );

        let imputer = KnnImputer::new(config.imputer.n_neighbors)
            .with_weights(config.imputer.weights)
            .with_feature_names(column_order.clone())
            .fit(cleaned.data())?;
        let reattacher = ColumnReattacher::new();
        let imputed = reattacher.transform(imputer.transform(cleaned.data())?, &column_order)?;

        let scaler = MinMaxScaler::new()
            .with_range(config.scaler.min, config.scaler.max)
            .with_feature_names(column_order.clone())
            .fit(imputed.data())?;
        let normalised = reattacher.transform(scaler.transform(imputed.data())?, &column_order)?;
        log::info!("Fitted preprocessing on {} rows", normalised.n_rows());

        Ok((
            Self {
                cleaner,
                imputer,
                scaler,
                reattacher,
                column_order,
                label_column,
            },
            normalised,
        ))
    }

    /// Run the fitted chain on raw rows.
    ///
    /// Rows without the label column get an all-missing label so the fitted
    /// widths still match; the imputer fills it and callers drop it.
    pub fn transform(&self, table: &Table) -> Result<Frame, PreprocessingError> {
        let cleaned = match self.cleaner.transform(table)? {
            CleanResult::Cleaned(frame) => frame,
            CleanResult::NoLabelPresent(frame) => frame
                .with_column(
                    &self.label_column,
                    Array1::from_elem(frame.n_rows(), f64::NAN),
                )
                .map_err(|e| PreprocessingError::InvalidParameter(e.to_string()))?,
        };
        self.check_column_order(cleaned.columns())?;

        let imputed = self
            .reattacher
            .transform(self.imputer.transform(cleaned.data())?, &self.column_order)?;
        let scaled = self.scaler.transform(imputed.data())?;
        self.reattacher.transform(scaled, &self.column_order)
    }

    fn check_column_order(&self, columns: &[String]) -> Result<(), PreprocessingError> {
        if columns.len() != self.column_order.len() {
            return Err(PreprocessingError::ColumnCountMismatch {
                expected: self.column_order.len(),
                got: columns.len(),
            });
        }
        match columns
            .iter()
            .zip(&self.column_order)
            .position(|(got, expected)| got != expected)
        {
            Some(position) => Err(PreprocessingError::ColumnOrderMismatch {
                position,
                expected: self.column_order[position].clone(),
                got: columns[position].clone(),
            }),
            None => Ok(()),
        }
    }

    /// Cleaned column order, label last.
    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Model input columns: the column order without the label.
    pub fn feature_names(&self) -> Vec<String> {
        self.column_order
            .iter()
            .filter(|c| **c != self.label_column)
            .cloned()
            .collect()
    }

    pub fn cleaner(&self) -> &FittedCleaner {
        &self.cleaner
    }

    pub fn imputer(&self) -> &FittedKnnImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &FittedMinMaxScaler {
        &self.scaler
    }

    pub fn to_bundle(&self) -> PreprocessingBundle {
        PreprocessingBundle {
            cleaner: self.cleaner.extract_params(),
            imputer: self.imputer.extract_params(),
            scaler: self.scaler.extract_params(),
            column_order: self.column_order.clone(),
            label_column: self.label_column.clone(),
        }
    }

    pub fn from_bundle(bundle: PreprocessingBundle) -> Result<Self, PreprocessingError> {
        if bundle.column_order.last() != Some(&bundle.label_column) {
            return Err(PreprocessingError::MissingColumn {
                column: bundle.label_column,
            });
        }
        let cleaner = FittedCleaner::from_params(bundle.cleaner)?;
        let imputer = FittedKnnImputer::from_params(bundle.imputer)?;
        let scaler = FittedMinMaxScaler::from_params(bundle.scaler)?;
        for n_features in [imputer.n_features_in(), scaler.n_features_in()] {
            if n_features != bundle.column_order.len() {
                return Err(PreprocessingError::FeatureMismatch {
                    expected_features: bundle.column_order.len(),
                    got_features: n_features,
                });
            }
        }

        Ok(Self {
            cleaner,
            imputer,
            scaler,
            reattacher: ColumnReattacher::new(),
            column_order: bundle.column_order,
            label_column: bundle.label_column,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        persistence::save_bundle(&self.to_bundle(), path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bundle = persistence::load_bundle(path)?;
        Ok(Self::from_bundle(bundle)?)
    }
}

/// Preprocessing plus a fitted classifier.
#[derive(Clone, Debug)]
pub struct Predictor<M: InferenceModel = FittedSvc> {
    preprocessor: FittedPreprocessor,
    model: M,
}

impl<M: InferenceModel> Predictor<M> {
    pub fn new(preprocessor: FittedPreprocessor, model: M) -> Result<Self, ModelError> {
        let expected = preprocessor.feature_names().len();
        if model.n_features_in() != expected {
            return Err(ModelError::FeatureMismatch {
                expected_features: expected,
                got_features: model.n_features_in(),
            });
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Normalised frame for `table`, label column included.
    pub fn preprocess(&self, table: &Table) -> Result<Frame> {
        Ok(self.preprocessor.transform(table)?)
    }

    /// Predict on an already normalised frame.
    pub fn predict_frame(&self, frame: &Frame) -> Result<Vec<usize>> {
        let features = frame.drop_column(self.preprocessor.label_column())?;
        Ok(self.model.predict(features.data())?)
    }

    /// Raw rows in, 0/1 predictions out.
    pub fn predict(&self, table: &Table) -> Result<Vec<usize>> {
        self.predict_frame(&self.preprocess(table)?)
    }
}

impl Predictor<FittedSvc> {
    /// Load the two artifacts written by training.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(bundle: P, model: Q) -> Result<Self> {
        let preprocessor = FittedPreprocessor::load(bundle)?;
        let artifact = persistence::load_model(model)?;
        if artifact.feature_names != preprocessor.feature_names() {
            return Err(PersistenceError::Invalid(
                "model and preprocessing bundle disagree on feature columns".to_string(),
            )
            .into());
        }
        let model = FittedSvc::from_params(artifact.estimator)?;
        log::info!(
            "Loaded model from experiment `{}` ({} support vectors)",
            artifact.experiment,
            model.support_vectors().nrows()
        );
        Ok(Self::new(preprocessor, model)?)
    }
}
