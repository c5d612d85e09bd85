//! Cohort cleaner.
//!
//! Recodes the ICU service unit to integer codes, drops the columns that leak
//! outcome information or carry only calendar noise, and renames the label
//! column (moving it to the last position). The output is an all-numeric
//! [`Frame`].
//!
//! Fitting is the identity: the cleaner learns nothing from data and exists as
//! a fitted object only so it can travel in the preprocessing bundle next to
//! the imputer and scaler.
//!
//! # Example
//! ```
//! use mimic_classifier::dataset::{Column, Table};
//! use mimic_classifier::preprocessing::{CleanResult, Cleaner, FittedTransformer, Transformer};
//!
//! let table = Table::new(vec![
//!     Column::numeric("age", vec![64.0, 51.0]),
//!     Column::text("service_unit", vec![Some("SICU"), Some("MICU")]),
//!     Column::text("day_icu_intime", vec![Some("Friday"), Some("Monday")]),
//!     Column::numeric("sepsis_flg", vec![0.0, 0.0]),
//!     Column::numeric("mal_flg", vec![1.0, 0.0]),
//! ])?;
//!
//! let cleaner = Cleaner::default().fit(&table)?;
//! let CleanResult::Cleaned(frame) = cleaner.transform(&table)? else {
//!     unreachable!("the label column is present");
//! };
//! assert_eq!(frame.columns(), &["age", "service_unit", "cancer"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::dataset::{ColumnData, Frame, Table};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for categorical values that have no code in the mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Fail with [`PreprocessingError::UnknownCategory`].
    #[default]
    Error,
    /// Treat the cell as missing so the imputer fills it.
    Ignore,
}

/// Cleaner configuration; also its serialized parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Text column recoded to integer codes.
    pub categorical_column: String,
    /// Category label to integer code.
    pub categories: BTreeMap<String, u32>,
    /// Columns removed unconditionally.
    pub drop_columns: Vec<String>,
    /// Label column in the raw schema.
    pub label_column: String,
    /// Name of the label column after cleaning.
    pub renamed_label: String,
    /// What to do with categories missing from `categories`.
    pub handle_unknown: HandleUnknown,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            categorical_column: "service_unit".to_string(),
            categories: BTreeMap::from([
                ("MICU".to_string(), 0),
                ("SICU".to_string(), 1),
                ("FICU".to_string(), 2),
            ]),
            drop_columns: vec!["day_icu_intime".to_string(), "sepsis_flg".to_string()],
            label_column: "mal_flg".to_string(),
            renamed_label: "cancer".to_string(),
            handle_unknown: HandleUnknown::Error,
        }
    }
}

/// Serialized form of a fitted cleaner.
pub type CleanerParams = CleanerConfig;

/// Outcome of cleaning a table.
///
/// Raw rows handed in for inference may come without the label column; that
/// is not an error, but callers have to decide what it means for them.
#[derive(Clone, Debug, PartialEq)]
pub enum CleanResult {
    /// The label column was present, renamed, and moved last.
    Cleaned(Frame),
    /// The label column was absent; the frame holds features only.
    NoLabelPresent(Frame),
}

impl CleanResult {
    pub fn frame(&self) -> &Frame {
        match self {
            CleanResult::Cleaned(frame) | CleanResult::NoLabelPresent(frame) => frame,
        }
    }

    pub fn into_frame(self) -> Frame {
        match self {
            CleanResult::Cleaned(frame) | CleanResult::NoLabelPresent(frame) => frame,
        }
    }

    pub fn has_label(&self) -> bool {
        matches!(self, CleanResult::Cleaned(_))
    }
}

/// Cleaner (unfitted).
#[derive(Clone, Debug, Default)]
pub struct Cleaner {
    config: CleanerConfig,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.config.handle_unknown = strategy;
        self
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }
}

fn validate_config(config: &CleanerConfig) -> Result<(), PreprocessingError> {
    if config.categories.is_empty() {
        return Err(PreprocessingError::InvalidParameter(format!(
            "no category codes configured for `{}`",
            config.categorical_column
        )));
    }
    for dropped in &config.drop_columns {
        if dropped == &config.label_column || dropped == &config.categorical_column {
            return Err(PreprocessingError::InvalidParameter(format!(
                "`{dropped}` cannot be both dropped and kept"
            )));
        }
    }
    if config.renamed_label.is_empty() {
        return Err(PreprocessingError::InvalidParameter(
            "renamed label must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Transformer for Cleaner {
    type Input = Table;
    type Output = CleanResult;
    type Params = CleanerParams;
    type Fitted = FittedCleaner;

    fn fit(&self, _data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        validate_config(&self.config)?;
        Ok(FittedCleaner {
            config: self.config.clone(),
        })
    }
}

/// Fitted cleaner ready for inference.
#[derive(Clone, Debug)]
pub struct FittedCleaner {
    config: CleanerConfig,
}

impl FittedCleaner {
    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    fn recode(&self, data: &ColumnData) -> Result<Vec<f64>, PreprocessingError> {
        let column = &self.config.categorical_column;
        let unknown = |value: String| match self.config.handle_unknown {
            HandleUnknown::Error => Err(PreprocessingError::UnknownCategory {
                column: column.clone(),
                value,
            }),
            HandleUnknown::Ignore => Ok(f64::NAN),
        };

        match data {
            ColumnData::Text(values) => values
                .iter()
                .map(|cell| match cell {
                    None => Ok(f64::NAN),
                    Some(text) => match self.config.categories.get(text) {
                        Some(&code) => Ok(f64::from(code)),
                        None => unknown(text.clone()),
                    },
                })
                .collect(),
            // Already-encoded input: accept the codes we know and nothing else.
            ColumnData::Numeric(values) => values
                .iter()
                .map(|&value| {
                    let known = value.is_nan()
                        || self
                            .config
                            .categories
                            .values()
                            .any(|&code| f64::from(code) == value);
                    if known {
                        Ok(value)
                    } else {
                        unknown(value.to_string())
                    }
                })
                .collect(),
        }
    }
}

impl FittedTransformer for FittedCleaner {
    type Input = Table;
    type Output = CleanResult;
    type Params = CleanerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let config = &self.config;
        // Work on a private copy; the caller's table is never touched.
        let mut columns = data.columns().to_vec();

        let categorical = columns
            .iter()
            .position(|c| c.name == config.categorical_column)
            .ok_or_else(|| PreprocessingError::MissingColumn {
                column: config.categorical_column.clone(),
            })?;
        columns[categorical].data = ColumnData::Numeric(self.recode(&columns[categorical].data)?);

        for dropped in &config.drop_columns {
            let index = columns
                .iter()
                .position(|c| &c.name == dropped)
                .ok_or_else(|| PreprocessingError::MissingColumn {
                    column: dropped.clone(),
                })?;
            columns.remove(index);
        }

        let has_label = match columns.iter().position(|c| c.name == config.label_column) {
            Some(index) => {
                if config.renamed_label != config.label_column
                    && columns.iter().any(|c| c.name == config.renamed_label)
                {
                    return Err(PreprocessingError::DuplicateColumn(
                        config.renamed_label.clone(),
                    ));
                }
                let mut label = columns.remove(index);
                label.name = config.renamed_label.clone();
                columns.push(label);
                true
            }
            None => {
                log::warn!(
                    "No `{}` column in input; cleaned features only",
                    config.label_column
                );
                false
            }
        };

        let n_rows = data.n_rows();
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            match column.data {
                ColumnData::Numeric(cells) => values.push(cells),
                ColumnData::Text(_) => {
                    return Err(PreprocessingError::NonNumericColumn {
                        column: column.name,
                    })
                }
            }
            names.push(column.name);
        }

        let matrix = Array2::from_shape_fn((n_rows, values.len()), |(r, c)| values[c][r]);
        let frame = Frame::from_parts(names, matrix);

        Ok(if has_label {
            CleanResult::Cleaned(frame)
        } else {
            CleanResult::NoLabelPresent(frame)
        })
    }

    fn extract_params(&self) -> Self::Params {
        self.config.clone()
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        validate_config(&params)?;
        Ok(Self { config: params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn raw_table() -> Table {
        Table::new(vec![
            Column::numeric("aline_flg", vec![1.0, 0.0, 1.0]),
            Column::numeric("age", vec![68.0, f64::NAN, 45.0]),
            Column::text("service_unit", vec![Some("SICU"), Some("FICU"), Some("MICU")]),
            Column::text("day_icu_intime", vec![Some("Friday"), Some("Monday"), None]),
            Column::numeric("sepsis_flg", vec![0.0, 0.0, 0.0]),
            Column::numeric("mal_flg", vec![0.0, 1.0, 0.0]),
            Column::numeric("bmi", vec![27.1, 30.4, 22.9]),
        ])
        .unwrap()
    }

    fn fitted() -> FittedCleaner {
        Cleaner::default().fit(&raw_table()).unwrap()
    }

    #[test]
    fn test_cleaner_column_arithmetic() {
        let table = raw_table();
        let result = fitted().transform(&table).unwrap();
        assert!(result.has_label());

        let frame = result.frame();
        assert_eq!(frame.n_columns(), table.n_columns() - 2);
        assert_eq!(frame.n_rows(), table.n_rows());
        assert_eq!(
            frame.columns(),
            &["aline_flg", "age", "service_unit", "bmi", "cancer"]
        );
    }

    #[test]
    fn test_cleaner_recodes_service_unit() {
        let frame = fitted().transform(&raw_table()).unwrap().into_frame();
        assert_eq!(
            frame.column("service_unit").unwrap().to_vec(),
            vec![1.0, 2.0, 0.0]
        );
        assert_eq!(frame.column("cancer").unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
        assert!(frame.column("age").unwrap()[1].is_nan());
    }

    #[test]
    fn test_cleaner_does_not_mutate_input() {
        let table = raw_table();
        let before = table.clone();
        fitted().transform(&table).unwrap();
        assert!(table.same_cells(&before));
        assert!(table.column("age").unwrap().data.as_numeric().unwrap()[1].is_nan());
        assert!(table.contains("mal_flg"));
        assert!(table.contains("day_icu_intime"));
    }

    #[test]
    fn test_cleaner_without_label_reports_status() {
        let table = raw_table().without_column("mal_flg").unwrap();
        let result = fitted().transform(&table).unwrap();
        match result {
            CleanResult::NoLabelPresent(frame) => {
                assert_eq!(frame.columns(), &["aline_flg", "age", "service_unit", "bmi"]);
            }
            CleanResult::Cleaned(_) => panic!("label should be reported missing"),
        }
    }

    #[test]
    fn test_cleaner_rejects_unknown_category() {
        let mut columns = raw_table().into_columns();
        columns[2] = Column::text("service_unit", vec![Some("SICU"), Some("CCU"), Some("MICU")]);
        let table = Table::new(columns).unwrap();

        let err = fitted().transform(&table).unwrap_err();
        assert!(matches!(
            err,
            PreprocessingError::UnknownCategory { ref value, .. } if value == "CCU"
        ));
    }

    #[test]
    fn test_cleaner_ignore_unknown_category_becomes_missing() {
        let mut columns = raw_table().into_columns();
        columns[2] = Column::text("service_unit", vec![Some("SICU"), Some("CCU"), Some("MICU")]);
        let table = Table::new(columns).unwrap();

        let cleaner = Cleaner::default()
            .with_handle_unknown(HandleUnknown::Ignore)
            .fit(&table)
            .unwrap();
        let frame = cleaner.transform(&table).unwrap().into_frame();
        let codes = frame.column("service_unit").unwrap();
        assert_eq!(codes[0], 1.0);
        assert!(codes[1].is_nan());
    }

    #[test]
    fn test_cleaner_accepts_pre_encoded_codes() {
        let mut columns = raw_table().into_columns();
        columns[2] = Column::numeric("service_unit", vec![1.0, 2.0, 0.0]);
        let table = Table::new(columns).unwrap();
        let frame = fitted().transform(&table).unwrap().into_frame();
        assert_eq!(
            frame.column("service_unit").unwrap().to_vec(),
            vec![1.0, 2.0, 0.0]
        );

        let mut columns = raw_table().into_columns();
        columns[2] = Column::numeric("service_unit", vec![1.0, 7.0, 0.0]);
        let table = Table::new(columns).unwrap();
        assert!(matches!(
            fitted().transform(&table),
            Err(PreprocessingError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_cleaner_missing_drop_column_is_schema_error() {
        let table = raw_table().without_column("sepsis_flg").unwrap();
        let err = fitted().transform(&table).unwrap_err();
        assert!(matches!(
            err,
            PreprocessingError::MissingColumn { ref column } if column == "sepsis_flg"
        ));
    }

    #[test]
    fn test_cleaner_rejects_leftover_text_column() {
        let mut columns = raw_table().into_columns();
        columns.push(Column::text("ethnicity", vec![Some("a"), Some("b"), Some("c")]));
        let table = Table::new(columns).unwrap();
        assert!(matches!(
            fitted().transform(&table),
            Err(PreprocessingError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn test_cleaner_params_round_trip() {
        let cleaner = fitted();
        let restored = FittedCleaner::from_params(cleaner.extract_params()).unwrap();
        assert_eq!(restored.config(), cleaner.config());
    }

    #[test]
    fn test_cleaner_rejects_conflicting_config() {
        let config = CleanerConfig {
            drop_columns: vec!["mal_flg".to_string()],
            ..CleanerConfig::default()
        };
        assert!(Cleaner::new(config).fit(&raw_table()).is_err());
    }
}
