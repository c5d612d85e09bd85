//! Tabular data containers, the CSV loader and the train/test splitter.
//!
//! # Core Concepts
//!
//! - **Table** — the raw cohort as read from disk. Columns are either numeric
//!   (`NaN` marks a missing cell) or text (`None` marks a missing cell).
//! - **Frame** — an all-numeric, labelled matrix. This is what the cleaner
//!   produces and what the reattacher rebuilds after imputation and scaling.
//! - **Split** — a seeded, shuffled partition of `(X, y)` into train and test.
//!
//! # Example
//!
//! ```no_run
//! use mimic_classifier::dataset::{load_csv, train_test_split};
//!
//! let table = load_csv("full_cohort_data.csv")?;
//! println!("{} rows, {} columns", table.n_rows(), table.n_columns());
//! # Ok::<(), mimic_classifier::dataset::DatasetError>(())
//! ```

mod frame;
mod loader;
mod split;
mod table;

pub use frame::Frame;
pub use loader::{is_missing_marker, load_csv, read_csv};
pub use split::{train_test_split, TrainTestSplit};
pub use table::{Column, ColumnData, Table};

use thiserror::Error;

/// Errors raised while loading, reshaping or splitting tabular data.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The CSV reader failed (I/O, UTF-8, or ragged rows).
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    /// The source file could not be opened.
    #[error("failed to open dataset: {0}")]
    Io(#[from] std::io::Error),
    /// The CSV has no header columns.
    #[error("dataset has no columns")]
    NoColumns,
    /// Two columns share a name.
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),
    /// A column holds a different number of cells than its siblings.
    #[error("column `{column}` has {got} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
    /// A column name does not match the matrix width.
    #[error("{names} column names for a matrix with {width} columns")]
    WidthMismatch { names: usize, width: usize },
    /// A requested column does not exist.
    #[error("unknown column `{0}`")]
    MissingColumn(String),
    /// A requested row is beyond the end of the table.
    #[error("row {row} is out of bounds for {n_rows} rows")]
    RowOutOfBounds { row: usize, n_rows: usize },
    /// A label cell is not 0 or 1.
    #[error("invalid label {value} at row {row} of column `{column}`: expected 0 or 1")]
    InvalidLabel {
        column: String,
        row: usize,
        value: f64,
    },
    /// Features and labels disagree on the number of samples.
    #[error("feature matrix has {rows} rows but {labels} labels were given")]
    ShapeMismatch { rows: usize, labels: usize },
    /// `test_size` outside `(0, 1)`.
    #[error("test_size must lie in (0, 1), got {0}")]
    InvalidTestSize(f64),
    /// The split would leave one side without rows.
    #[error("split leaves an empty partition ({n_train} train / {n_test} test rows)")]
    EmptyPartition { n_train: usize, n_test: usize },
}
