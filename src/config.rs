//! Run configuration.
//!
//! Everything the workflow needs (column names, category codes, K, split
//! sizes and seeds, class weights, search grids, SMOTE settings, artifact
//! names) lives in [`Config`]. It deserialises from TOML, and every field
//! has a default that reproduces the reference cohort study.
//!
//! ```toml
//! [preprocessing.imputer]
//! n_neighbors = 5
//!
//! [training]
//! persist = "direct"
//!
//! [[training.experiments]]
//! name = "direct"
//! class_weight = { negative = 1, positive = 4 }
//! split = { test_size = 0.3, seed = 5 }
//! policy = { kind = "direct" }
//! ```

use crate::model::{ClassWeight, CrossValidation, ParamGrid, SvcConfig};
use crate::preprocessing::{CleanerConfig, KnnWeights};
use crate::resampling::Smote;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
    pub artifacts: ArtifactConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub cleaner: CleanerConfig,
    pub imputer: ImputerConfig,
    pub scaler: ScalerConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    pub n_neighbors: usize,
    pub weights: KnnWeights,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 7,
            weights: KnnWeights::Uniform,
        }
    }
}

/// Target range of the min-max scaler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Train/test split of the normalised frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub test_size: f64,
    pub seed: u64,
}

/// How the classifier is fit on the training partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainingPolicy {
    /// A single fit with the base hyperparameters.
    Direct,
    /// Cross-validated search over `C` × `gamma`, then refit.
    GridSearch {
        grid: ParamGrid,
        #[serde(default)]
        cv: CrossValidation,
    },
}

/// One train-and-evaluate run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub split: SplitConfig,
    #[serde(default)]
    pub class_weight: ClassWeight,
    pub policy: TrainingPolicy,
    /// SMOTE on the training partition before fitting.
    #[serde(default)]
    pub oversample: Option<Smote>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Base SVC settings; experiments override `class_weight`, and grid
    /// searches override `c` and `gamma`.
    pub svc: SvcConfig,
    pub experiments: Vec<ExperimentConfig>,
    /// Name of the experiment whose model is saved.
    pub persist: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            svc: SvcConfig::default(),
            experiments: vec![
                ExperimentConfig {
                    name: "direct".to_string(),
                    split: SplitConfig {
                        test_size: 0.3,
                        seed: 5,
                    },
                    class_weight: ClassWeight::new(1, 4),
                    policy: TrainingPolicy::Direct,
                    oversample: None,
                },
                ExperimentConfig {
                    name: "grid_search".to_string(),
                    split: SplitConfig {
                        test_size: 0.3,
                        seed: 5,
                    },
                    class_weight: ClassWeight::new(1, 5),
                    policy: TrainingPolicy::GridSearch {
                        grid: ParamGrid::linspace(-10.0, 10.0, 30).positive_only(),
                        cv: CrossValidation::default(),
                    },
                    oversample: None,
                },
                ExperimentConfig {
                    name: "smote_grid_search".to_string(),
                    split: SplitConfig {
                        test_size: 0.2,
                        seed: 10,
                    },
                    class_weight: ClassWeight::new(1, 2),
                    policy: TrainingPolicy::GridSearch {
                        grid: ParamGrid::linspace(0.01, 10.0, 5),
                        cv: CrossValidation::default(),
                    },
                    oversample: Some(Smote::new(5, 10)),
                },
            ],
            persist: "smote_grid_search".to_string(),
        }
    }
}

/// File names of the artifacts written by `train`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub bundle: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            bundle: PathBuf::from("MIMIC_Cancer_Classifier_Preprocessing.bin"),
            model: PathBuf::from("MIMIC_Cancer_Classifier_Model.bin"),
            report: PathBuf::from("MIMIC_Cancer_Classifier_Report.json"),
        }
    }
}

impl ArtifactConfig {
    /// The same file names under `dir`.
    pub fn under(&self, dir: &Path) -> Self {
        Self {
            bundle: dir.join(&self.bundle),
            model: dir.join(&self.model),
            report: dir.join(&self.report),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that do not need data: ranges, names and references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.preprocessing.imputer.n_neighbors == 0 {
            return invalid("imputer.n_neighbors must be at least 1".into());
        }
        let scaler = &self.preprocessing.scaler;
        if !(scaler.min.is_finite() && scaler.max.is_finite() && scaler.max > scaler.min) {
            return invalid(format!(
                "scaler range [{}, {}] must be finite with max > min",
                scaler.min, scaler.max
            ));
        }
        self.training
            .svc
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut names = HashSet::new();
        for exp in &self.training.experiments {
            if !names.insert(exp.name.as_str()) {
                return invalid(format!("duplicate experiment name `{}`", exp.name));
            }
            if !(exp.split.test_size > 0.0 && exp.split.test_size < 1.0) {
                return invalid(format!(
                    "experiment `{}`: test_size must be in (0, 1), got {}",
                    exp.name, exp.split.test_size
                ));
            }
            if exp.class_weight.negative == 0 || exp.class_weight.positive == 0 {
                return invalid(format!(
                    "experiment `{}`: class weights must be at least 1",
                    exp.name
                ));
            }
            if let TrainingPolicy::GridSearch { grid, cv } = &exp.policy {
                grid.validate()
                    .map_err(|e| ConfigError::Invalid(format!("experiment `{}`: {e}", exp.name)))?;
                if cv.n_folds < 2 {
                    return invalid(format!(
                        "experiment `{}`: n_folds must be at least 2",
                        exp.name
                    ));
                }
            }
            if let Some(smote) = &exp.oversample {
                if smote.k_neighbors == 0 {
                    return invalid(format!(
                        "experiment `{}`: k_neighbors must be at least 1",
                        exp.name
                    ));
                }
            }
        }
        if !names.contains(self.training.persist.as_str()) {
            return invalid(format!(
                "persist names unknown experiment `{}`",
                self.training.persist
            ));
        }
        Ok(())
    }

    pub fn experiment(&self, name: &str) -> Option<&ExperimentConfig> {
        self.training.experiments.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.training.experiments.len(), 3);
        assert_eq!(config.preprocessing.imputer.n_neighbors, 7);
        assert_eq!(
            config.experiment("smote_grid_search").unwrap().oversample,
            Some(Smote::new(5, 10))
        );
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let text = r#"
            [preprocessing.imputer]
            n_neighbors = 3
            weights = "distance"

            [training]
            persist = "quick"

            [[training.experiments]]
            name = "quick"
            split = { test_size = 0.25, seed = 1 }
            class_weight = { negative = 1, positive = 3 }
            policy = { kind = "grid_search", grid = { c = [0.5, 1.0], gamma = [0.1] } }
        "#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.preprocessing.imputer.n_neighbors, 3);
        assert_eq!(config.preprocessing.imputer.weights, KnnWeights::Distance);
        assert_eq!(config.preprocessing.cleaner, CleanerConfig::default());

        let exp = config.experiment("quick").unwrap();
        assert_eq!(exp.class_weight, ClassWeight::new(1, 3));
        match &exp.policy {
            TrainingPolicy::GridSearch { grid, cv } => {
                assert_eq!(grid.c, vec![0.5, 1.0]);
                assert_eq!(cv.n_folds, 5);
            }
            other => panic!("unexpected policy {other:?}"),
        }
    }

    #[test]
    fn test_invalid_configs() {
        let unknown_persist = "[training]\npersist = \"nope\"";
        assert!(matches!(
            Config::from_toml_str(unknown_persist),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = Config::default();
        config.training.experiments[0].split.test_size = 1.5;
        assert!(config.validate().is_err());

        assert!(matches!(
            Config::from_toml_str("[preprocessing.imputer]\nn_neighbors = \"seven\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_artifact_paths_under_dir() {
        let paths = ArtifactConfig::default().under(Path::new("out"));
        assert_eq!(
            paths.model,
            Path::new("out").join("MIMIC_Cancer_Classifier_Model.bin")
        );
    }
}
