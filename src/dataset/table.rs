//! The raw, mixed-type cohort table.

use super::DatasetError;
use std::collections::HashSet;
use std::ops::Range;

/// Cell storage of a single column.
///
/// The derived `PartialEq` follows `f64`, so a column holding a missing
/// numeric cell never equals itself. Use [`ColumnData::same_cells`] to
/// compare contents.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    /// Numeric cells; `NaN` marks a missing value.
    Numeric(Vec<f64>),
    /// Free-text / categorical cells; `None` marks a missing value.
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing cells.
    pub fn n_missing(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_nan()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Numeric cells, if this is a numeric column.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    /// Cell-by-cell equality where two missing numeric cells match.
    pub fn same_cells(&self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Numeric(a), ColumnData::Numeric(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(*x, *y))
            }
            (ColumnData::Text(a), ColumnData::Text(b)) => a == b,
            _ => false,
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&r| values[r]).collect())
            }
            ColumnData::Text(values) => {
                ColumnData::Text(rows.iter().map(|&r| values[r].clone()).collect())
            }
        }
    }
}

/// `NaN` matches `NaN`; anything else compares as `f64`.
pub(crate) fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// A named column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    /// Numeric column constructor.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Text column constructor.
    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }
}

/// Column-oriented table with unique column names and equal column lengths.
///
/// A `Table` is the loader's output and the cleaner's input. It is never
/// mutated in place; every reshaping operation returns a new table.
///
/// `==` is `NaN`-strict like [`ColumnData`]; [`Table::same_cells`] is the
/// comparison to use on tables with missing cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let n_rows = columns.first().map_or(0, |c| c.data.len());
        let mut seen = HashSet::with_capacity(columns.len());

        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
            if column.data.len() != n_rows {
                return Err(DatasetError::LengthMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    got: column.data.len(),
                });
            }
        }

        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Same names, same order, same cells, with missing cells matching.
    pub fn same_cells(&self, other: &Table) -> bool {
        self.n_rows == other.n_rows
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.data.same_cells(&b.data))
    }

    /// Rows at the given positions, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Table, DatasetError> {
        if let Some(&row) = rows.iter().find(|&&r| r >= self.n_rows) {
            return Err(DatasetError::RowOutOfBounds {
                row,
                n_rows: self.n_rows,
            });
        }

        Ok(Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
            n_rows: rows.len(),
        })
    }

    /// Contiguous row window.
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Table, DatasetError> {
        let rows: Vec<usize> = range.collect();
        self.select_rows(&rows)
    }

    /// Table without the named column.
    pub fn without_column(&self, name: &str) -> Result<Table, DatasetError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        let mut columns = self.columns.clone();
        columns.remove(index);
        Ok(Table {
            columns,
            n_rows: self.n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("age", vec![40.0, f64::NAN, 71.0]),
            Column::text("service_unit", vec![Some("MICU"), Some("SICU"), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_shape_and_lookup() {
        let table = sample();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_columns(), 2);
        assert_eq!(table.column_names(), vec!["age", "service_unit"]);
        assert_eq!(table.column_index("service_unit"), Some(1));
        assert!(!table.contains("mal_flg"));
        assert_eq!(table.column("age").unwrap().data.n_missing(), 1);
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ]);
        assert!(matches!(
            result,
            Err(DatasetError::LengthMismatch { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let result = Table::new(vec![
            Column::numeric("a", vec![1.0]),
            Column::numeric("a", vec![2.0]),
        ]);
        assert!(matches!(result, Err(DatasetError::DuplicateColumn(_))));
    }

    #[test]
    fn test_select_rows_keeps_types() {
        let table = sample();
        let picked = table.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(
            picked.column("service_unit").unwrap().data,
            ColumnData::Text(vec![None, Some("MICU".to_string())])
        );
        assert_eq!(
            picked.column("age").unwrap().data.as_numeric().unwrap(),
            &[71.0, 40.0]
        );
    }

    #[test]
    fn test_select_rows_out_of_bounds() {
        let table = sample();
        assert!(matches!(
            table.slice_rows(2..4),
            Err(DatasetError::RowOutOfBounds { row: 3, n_rows: 3 })
        ));
    }

    #[test]
    fn test_without_column_leaves_original_intact() {
        let table = sample();
        let reduced = table.without_column("age").unwrap();
        assert_eq!(reduced.column_names(), vec!["service_unit"]);
        assert_eq!(table.n_columns(), 2);
        assert!(table.without_column("bmi").is_err());
    }

    #[test]
    fn test_same_cells_matches_missing_cells() {
        let table = sample();
        let copy = table.clone();
        assert_ne!(table, copy);
        assert!(table.same_cells(&copy));

        let changed = Table::new(vec![
            Column::numeric("age", vec![40.0, 55.0, 71.0]),
            Column::text("service_unit", vec![Some("MICU"), Some("SICU"), None]),
        ])
        .unwrap();
        assert!(!table.same_cells(&changed));
        assert!(!table.same_cells(&table.without_column("age").unwrap()));
        assert!(!table.same_cells(&table.slice_rows(0..2).unwrap()));

        let renamed = Table::new(vec![
            Column::numeric("age_years", vec![40.0, f64::NAN, 71.0]),
            Column::text("service_unit", vec![Some("MICU"), Some("SICU"), None]),
        ])
        .unwrap();
        assert!(!table.same_cells(&renamed));
    }
}
