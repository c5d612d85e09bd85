//! CSV loading with per-column type inference.

use super::{Column, ColumnData, DatasetError, Table};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Cell spellings treated as missing values.
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Whether a raw cell denotes a missing value.
pub fn is_missing_marker(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

/// Load a cohort CSV from disk.
///
/// The first row is the header. A column is numeric when every non-missing
/// cell parses as `f64`; otherwise it is kept as text.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Table, DatasetError> {
    let file = File::open(path.as_ref())?;
    log::info!("Loading dataset from {}", path.as_ref().display());
    read_csv(BufReader::new(file))
}

/// Read a cohort CSV from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<Table, DatasetError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(DatasetError::NoColumns);
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        for (column, cell) in raw.iter_mut().zip(record.iter()) {
            column.push(if is_missing_marker(cell) {
                None
            } else {
                Some(cell.to_string())
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column {
            name,
            data: infer_column(cells),
        })
        .collect();

    let table = Table::new(columns)?;
    log::debug!(
        "Read {} rows x {} columns",
        table.n_rows(),
        table.n_columns()
    );
    Ok(table)
}

fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<f64>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(f64::NAN),
            Some(text) => text.parse::<f64>().ok(),
        })
        .collect();

    match parsed {
        Some(values) => ColumnData::Numeric(values),
        None => ColumnData::Text(cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
aline_flg,age,service_unit,day_icu_intime,bmi
1,68.1,SICU,Friday,27.3
0,41.5,MICU,Monday,
1,NA,FICU,Sunday,31.0
";

    #[test]
    fn test_read_csv_infers_types() {
        let table = read_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(
            table.column_names(),
            vec!["aline_flg", "age", "service_unit", "day_icu_intime", "bmi"]
        );

        let age = table.column("age").unwrap().data.as_numeric().unwrap();
        assert_eq!(age[0], 68.1);
        assert!(age[2].is_nan());

        let bmi = table.column("bmi").unwrap();
        assert_eq!(bmi.data.n_missing(), 1);

        assert_eq!(
            table.column("service_unit").unwrap().data,
            ColumnData::Text(vec![
                Some("SICU".to_string()),
                Some("MICU".to_string()),
                Some("FICU".to_string()),
            ])
        );
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let csv = "a,b\n1,2\n3\n";
        assert!(matches!(read_csv(csv.as_bytes()), Err(DatasetError::Csv(_))));
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv("/nonexistent/full_cohort_data.csv");
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker("NA"));
        assert!(!is_missing_marker("0"));
    }
}
