use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;

use crate::columns;
use crate::dataset::{ColumnSchema, ColumnType, Dataset, DatasetError, DatasetResult};
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Field contents (after trimming) that are read as a missing value.
    ///
    /// Empty fields are always missing.
    pub null_tokens: Vec<String>,
    /// Columns that are always imported as text, even if every field parses as a number.
    pub text_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_tokens: ["NA", "N/A", "NaN", "nan", "null", "None"]
                .into_iter()
                .map(String::from)
                .collect(),
            text_columns: columns::TEXT_COLUMNS.into_iter().map(String::from).collect(),
        }
    }
}

/// Import a processed obesity CSV file from disk.
pub fn import_csv_path(path: impl AsRef<Path>, options: CsvOptions) -> DatasetResult<Dataset> {
    let file = File::open(path.as_ref())?;
    import_csv(BufReader::new(file), options)
}

/// Import a CSV stream into a [`Dataset`].
///
/// Column types are inferred from the whole input: a column is numeric when every non-missing
/// field parses as a number (and it is not listed in [`CsvOptions::text_columns`]). Rows shorter
/// than the header are padded with missing values; extra trailing fields are dropped.
pub fn import_csv<R: Read>(reader: R, options: CsvOptions) -> DatasetResult<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Headers are handled manually so row numbers stay consistent in errors.
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut record = StringRecord::new();
    let mut record_index: u64 = 0;
    let mut raw_rows: Vec<Vec<String>> = Vec::new();

    loop {
        match csv_reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                raw_rows.push(record.iter().map(|f| f.trim().to_string()).collect());
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    if raw_rows.is_empty() {
        return Err(DatasetError::EmptyInput);
    }

    let (header, body, first_data_row) = if options.has_header {
        let header = raw_rows.remove(0);
        (header, raw_rows, 2u64)
    } else {
        let width = raw_rows.iter().map(Vec::len).max().unwrap_or(0);
        let header = (0..width).map(|i| format!("column{}", i + 1)).collect();
        (header, raw_rows, 1u64)
    };
    let column_count = header.len();

    let column_types: Vec<ColumnType> = header
        .iter()
        .enumerate()
        .map(|(col, name)| infer_column_type(name, col, &body, &options))
        .collect();

    let schema = header
        .into_iter()
        .zip(column_types.iter().copied())
        .map(|(name, column_type)| ColumnSchema { name, column_type })
        .collect();
    let mut dataset = Dataset::new(schema)?;

    let mut pool = StringPool::default();
    let mut ragged = 0usize;
    for (offset, raw) in body.into_iter().enumerate() {
        let row_number = first_data_row + offset as u64;
        if raw.len() != column_count {
            ragged += 1;
        }

        let mut row = Vec::with_capacity(column_count);
        for (col, column_type) in column_types.iter().copied().enumerate() {
            let field = raw.get(col).map(String::as_str).unwrap_or("");
            let value = parse_typed_value(field, column_type, &options, &mut pool).ok_or_else(
                || DatasetError::Parse {
                    row: row_number,
                    column: col as u64 + 1,
                    reason: format!("expected a number, got {field:?}"),
                },
            )?;
            row.push(value);
        }

        if let Err(err) = dataset.push_row(row) {
            return Err(match err {
                DatasetError::InvalidNumber { column, value } => DatasetError::Parse {
                    row: row_number,
                    column: dataset.column_idx(&column).map_or(0, |idx| idx as u64 + 1),
                    reason: format!("invalid count {value} in column {column}"),
                },
                other => other,
            });
        }
    }

    if ragged > 0 {
        log::warn!("{ragged} csv rows did not match the header width of {column_count} fields");
    }
    log::debug!(
        "imported {} rows x {} columns from csv",
        dataset.row_count(),
        column_count
    );

    Ok(dataset)
}

fn is_null_token(field: &str, options: &CsvOptions) -> bool {
    field.is_empty() || options.null_tokens.iter().any(|t| t == field)
}

fn infer_column_type(
    name: &str,
    col: usize,
    rows: &[Vec<String>],
    options: &CsvOptions,
) -> ColumnType {
    if options.text_columns.iter().any(|c| c == name) {
        return ColumnType::Text;
    }

    for row in rows {
        let field = row.get(col).map(String::as_str).unwrap_or("");
        if is_null_token(field, options) {
            continue;
        }
        if field.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }

    // Includes columns with no recorded values at all; those are count columns with full
    // missingness, not text.
    ColumnType::Number
}

fn parse_typed_value(
    field: &str,
    column_type: ColumnType,
    options: &CsvOptions,
    pool: &mut StringPool,
) -> Option<Value> {
    if is_null_token(field, options) {
        return Some(Value::Null);
    }

    match column_type {
        ColumnType::Number => field.parse::<f64>().ok().map(Value::from),
        ColumnType::Text => Some(Value::Text(pool.intern(field))),
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> DatasetError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => DatasetError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record() + 1)
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            DatasetError::Parse {
                row,
                column: 0,
                reason,
            }
        }
    }
}

/// Deduplicates repeated text (country/region names repeat on every row).
#[derive(Default)]
struct StringPool {
    set: std::collections::HashSet<Arc<str>>,
}

impl StringPool {
    fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.set.get(s) {
            return existing.clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.set.insert(arc.clone());
        arc
    }
}
