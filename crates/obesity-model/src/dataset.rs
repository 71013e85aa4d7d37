use crate::value::Value;
use std::collections::{BTreeSet, HashMap};

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("duplicate column: {column}")]
    DuplicateColumn { column: String },

    #[error("schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("type mismatch in column {column}: expected {expected:?}, got {value}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        value: Value,
    },

    #[error("invalid number in column {column}: {value} (counts must be finite and non-negative)")]
    InvalidNumber { column: String, value: f64 },

    #[error("csv input was empty")]
    EmptyInput,

    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnType {
    #[default]
    Text,
    Number,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Text,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Number,
        }
    }
}

/// An immutable-after-load table of country/year observations.
///
/// Every row has exactly one value per schema column. Number columns only ever hold finite,
/// non-negative numbers or [`Value::Null`]; text columns only hold text or [`Value::Null`].
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    schema: Vec<ColumnSchema>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(schema: Vec<ColumnSchema>) -> DatasetResult<Self> {
        let mut column_index = HashMap::with_capacity(schema.len());
        for (idx, col) in schema.iter().enumerate() {
            if column_index.insert(col.name.clone(), idx).is_some() {
                return Err(DatasetError::DuplicateColumn {
                    column: col.name.clone(),
                });
            }
        }

        Ok(Self {
            schema,
            column_index,
            rows: Vec::new(),
        })
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_idx(&self, column: &str) -> Option<usize> {
        self.column_index.get(column).copied()
    }

    pub fn column_type(&self, idx: usize) -> Option<ColumnType> {
        self.schema.get(idx).map(|c| c.column_type)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> DatasetResult<()> {
        if row.len() != self.schema.len() {
            return Err(DatasetError::SchemaMismatch {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }

        for (col, value) in self.schema.iter().zip(row.iter()) {
            check_value(col, value)?;
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_idx(column)?;
        self.value_by_idx(row, idx)
    }

    pub fn value_by_idx(&self, row: usize, idx: usize) -> Option<&Value> {
        self.rows.get(row)?.get(idx)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Distinct non-null values of a column, in sorted order.
    ///
    /// Returns `None` if the column does not exist.
    pub fn distinct_values(&self, column: &str) -> Option<BTreeSet<Value>> {
        let idx = self.column_idx(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| &row[idx])
                .filter(|v| !v.is_null())
                .cloned()
                .collect(),
        )
    }
}

fn check_value(col: &ColumnSchema, value: &Value) -> DatasetResult<()> {
    match (col.column_type, value) {
        (_, Value::Null) => Ok(()),
        (ColumnType::Text, Value::Text(_)) => Ok(()),
        (ColumnType::Number, Value::Number(n)) => {
            let n = n.0;
            if n.is_finite() && n >= 0.0 {
                Ok(())
            } else {
                Err(DatasetError::InvalidNumber {
                    column: col.name.clone(),
                    value: n,
                })
            }
        }
        (expected, value) => Err(DatasetError::TypeMismatch {
            column: col.name.clone(),
            expected,
            value: value.clone(),
        }),
    }
}
