//! End-to-end training runs.
//!
//! [`train`] fits the preprocessing chain once on the full table, then runs
//! every configured experiment on the normalised frame: split, optional SMOTE
//! on the training part, direct fit or grid search, and a classification
//! report on the held-out part. [`train_and_save`] also writes the bundle,
//! the selected model and a JSON summary of all experiments.

use crate::config::{Config, ConfigError, ExperimentConfig, TrainingPolicy};
use crate::dataset::{train_test_split, DatasetError, Frame, Table};
use crate::error::Result;
use crate::metrics::{class_counts, ClassificationReport};
use crate::model::{
    ClassWeight, FittedSvc, GridSearch, InferenceModel, Kernel, SearchSummary, Svc, SvcConfig,
};
use crate::persistence::{self, ModelArtifact, PersistenceError};
use crate::pipeline::{FittedPreprocessor, Predictor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

/// Summary of one experiment, written to the JSON report.
#[derive(Clone, Debug, Serialize)]
pub struct ExperimentReport {
    pub name: String,
    pub n_train: usize,
    pub n_test: usize,
    pub train_class_counts: BTreeMap<usize, usize>,
    /// Class counts after SMOTE, when oversampling ran.
    pub resampled_class_counts: Option<BTreeMap<usize, usize>>,
    pub class_weight: ClassWeight,
    pub c: f64,
    pub gamma: Option<f64>,
    /// Mean cross-validation accuracy of the chosen candidate.
    pub cv_score: Option<f64>,
    pub evaluation: ClassificationReport,
}

/// A fitted experiment: its model, search table and report.
#[derive(Clone, Debug)]
pub struct ExperimentOutcome {
    pub model: FittedSvc,
    pub search: Option<SearchSummary>,
    pub report: ExperimentReport,
}

/// Run one experiment on a normalised frame.
pub fn run_experiment(
    frame: &Frame,
    label: &str,
    base: &SvcConfig,
    experiment: &ExperimentConfig,
) -> Result<ExperimentOutcome> {
    log::info!("Experiment `{}`", experiment.name);
    let (x, y) = frame.split_xy(label)?;
    let split = train_test_split(&x, &y, experiment.split.test_size, experiment.split.seed)?;
    let train_class_counts = class_counts(&split.y_train);
    log::info!(
        "Training set: {}, test set: {}, training classes {:?}",
        split.y_train.len(),
        split.y_test.len(),
        train_class_counts
    );

    let (x_train, y_train, resampled_class_counts) = match &experiment.oversample {
        Some(smote) => {
            let (x_res, y_res) = smote.fit_resample(&split.x_train, &split.y_train)?;
            let counts = class_counts(&y_res);
            (x_res, y_res, Some(counts))
        }
        None => (split.x_train.clone(), split.y_train.clone(), None),
    };

    let svc = Svc::from_config(*base).with_class_weight(experiment.class_weight);
    let (model, search) = match &experiment.policy {
        TrainingPolicy::Direct => (svc.fit(&x_train, &y_train)?, None),
        TrainingPolicy::GridSearch { grid, cv } => {
            let (model, summary) = GridSearch::new(svc, grid.clone())
                .with_cv(*cv)
                .fit(&x_train, &y_train)?
                .into_parts();
            (model, Some(summary))
        }
    };

    let predictions = model.predict(&split.x_test)?;
    let evaluation = ClassificationReport::new(&split.y_test, &predictions)?;
    log::info!(
        "Experiment `{}` on held-out data:\n{}\n{}",
        experiment.name,
        evaluation.confusion_matrix,
        evaluation
    );

    let gamma = match model.kernel() {
        Kernel::Rbf { gamma } => Some(gamma),
        Kernel::Linear => None,
    };
    let report = ExperimentReport {
        name: experiment.name.clone(),
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        train_class_counts,
        resampled_class_counts,
        class_weight: experiment.class_weight,
        c: model.c(),
        gamma,
        cv_score: search.as_ref().map(|s| s.best_score),
        evaluation,
    };

    Ok(ExperimentOutcome {
        model,
        search,
        report,
    })
}

/// Fitted preprocessing plus every experiment, in configuration order.
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub preprocessor: FittedPreprocessor,
    pub experiments: Vec<ExperimentOutcome>,
}

impl TrainingOutcome {
    pub fn experiment(&self, name: &str) -> Option<&ExperimentOutcome> {
        self.experiments.iter().find(|e| e.report.name == name)
    }

    pub fn reports(&self) -> Vec<&ExperimentReport> {
        self.experiments.iter().map(|e| &e.report).collect()
    }

    /// Predictor built from the named experiment's model.
    pub fn predictor(&self, name: &str) -> Result<Predictor> {
        let outcome = self.experiment(name).ok_or_else(|| {
            ConfigError::Invalid(format!("no experiment named `{name}`"))
        })?;
        Ok(Predictor::new(
            self.preprocessor.clone(),
            outcome.model.clone(),
        )?)
    }
}

/// Fit preprocessing on `table` and run every configured experiment.
pub fn train(table: &Table, config: &Config) -> Result<TrainingOutcome> {
    config.validate()?;
    let (preprocessor, normalised) = FittedPreprocessor::fit(table, &config.preprocessing)?;
    log::info!(
        "Class distribution of the full data: {:?}",
        class_counts(&normalised.split_xy(preprocessor.label_column())?.1)
    );

    let experiments = config
        .training
        .experiments
        .iter()
        .map(|exp| {
            run_experiment(
                &normalised,
                preprocessor.label_column(),
                &config.training.svc,
                exp,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TrainingOutcome {
        preprocessor,
        experiments,
    })
}

/// [`train`], then write the bundle, the persisted model and the report
/// under `out_dir`.
pub fn train_and_save(table: &Table, config: &Config, out_dir: &Path) -> Result<TrainingOutcome> {
    let outcome = train(table, config)?;
    let paths = config.artifacts.under(out_dir);

    let persisted = outcome
        .experiment(&config.training.persist)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "persist names unknown experiment `{}`",
                config.training.persist
            ))
        })?;

    outcome.preprocessor.save(&paths.bundle)?;
    persistence::save_model(
        &ModelArtifact {
            estimator: persisted.model.extract_params(),
            search: persisted.search.clone(),
            feature_names: outcome.preprocessor.feature_names(),
            experiment: persisted.report.name.clone(),
        },
        &paths.model,
    )?;

    let json = serde_json::to_string_pretty(&outcome.reports())?;
    std::fs::write(&paths.report, json).map_err(PersistenceError::from)?;
    log::info!("Wrote experiment report to {}", paths.report.display());

    Ok(outcome)
}

/// A seeded random window of `n` consecutive rows, for smoke predictions.
pub fn sample_rows(table: &Table, n: usize, seed: u64) -> Result<(Table, Range<usize>)> {
    if n == 0 || n > table.n_rows() {
        return Err(DatasetError::RowOutOfBounds {
            row: n,
            n_rows: table.n_rows(),
        }
        .into());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let start = rng.gen_range(0..=table.n_rows() - n);
    let range = start..start + n;
    Ok((table.slice_rows(range.clone())?, range))
}
