use crate::error::{RateError, RateResult};
use crate::filter::NormalizedFilter;
use obesity_model::{columns, ColumnType, Dataset, Value};
use std::collections::HashMap;

/// Running numerator/denominator sums for one group and value column.
///
/// Only rows where both the value column and `pop` are present contribute to either side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RateCell {
    pub numerator: f64,
    pub denominator: f64,
}

impl RateCell {
    /// `numerator / denominator`, or `None` when no population was observed.
    pub fn rate(&self) -> Option<f64> {
        (self.denominator > 0.0).then(|| self.numerator / self.denominator)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateRow {
    /// One value per grouping column, in the order requested.
    pub key: Vec<Value>,
    /// One cell per value column, in the order requested.
    pub cells: Vec<RateCell>,
}

impl RateRow {
    fn new(key: Vec<Value>, value_columns: usize) -> Self {
        Self {
            key,
            cells: vec![RateCell::default(); value_columns],
        }
    }

    pub fn rate(&self, value_idx: usize) -> Option<f64> {
        self.cells.get(value_idx)?.rate()
    }

    pub fn rates(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(RateCell::rate).collect()
    }
}

/// The result of [`aggregate`]: one row per grouping key present in the filtered data.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    pub group_columns: Vec<String>,
    pub value_columns: Vec<String>,
    /// Sorted by key.
    pub rows: Vec<RateRow>,
}

impl RateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value_column_idx(&self, column: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c == column)
    }

    pub fn group_column_idx(&self, column: &str) -> Option<usize> {
        self.group_columns.iter().position(|c| c == column)
    }

    pub fn row(&self, key: &[Value]) -> Option<&RateRow> {
        self.rows
            .binary_search_by(|row| row.key.as_slice().cmp(key))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Rate of `column` for the group with the given key.
    pub fn rate(&self, key: &[Value], column: &str) -> Option<f64> {
        let idx = self.value_column_idx(column)?;
        self.row(key)?.rate(idx)
    }
}

/// Compute population-weighted rates per group.
///
/// 1. Rows are restricted to those admitted by `filter`.
/// 2. Rows are partitioned by exact equality on every `group_by` column (a null key is its own
///    group). With no grouping columns, all matching rows form a single group.
/// 3. For every value column independently, the group's rate is `sum(value) / sum(pop)` over the
///    rows where both `value` and `pop` are present. A row missing one value column still counts
///    toward the others.
///
/// Groups with no usable population report a missing rate rather than failing. Unknown columns,
/// and value columns (or `pop`) that are not numeric, are rejected before any row is scanned.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &[&str],
    value_columns: &[&str],
    filter: &NormalizedFilter,
) -> RateResult<RateTable> {
    let group_idxs = group_by
        .iter()
        .map(|column| {
            dataset
                .column_idx(column)
                .ok_or_else(|| RateError::unknown_column(column))
        })
        .collect::<RateResult<Vec<_>>>()?;
    let value_idxs = value_columns
        .iter()
        .map(|column| numeric_column_idx(dataset, column))
        .collect::<RateResult<Vec<_>>>()?;
    let pop_idx = numeric_column_idx(dataset, columns::POP)?;
    let bound = filter.bind(dataset)?;

    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<RateRow> = Vec::new();
    let mut matched = 0usize;

    for row in dataset.rows() {
        if !bound.matches(row) {
            continue;
        }
        matched += 1;

        let key: Vec<Value> = group_idxs.iter().map(|&idx| row[idx].clone()).collect();
        let slot = *index.entry(key).or_insert_with_key(|key| {
            groups.push(RateRow::new(key.clone(), value_idxs.len()));
            groups.len() - 1
        });

        let Some(pop) = row[pop_idx].as_f64() else {
            continue;
        };
        for (cell, &idx) in groups[slot].cells.iter_mut().zip(value_idxs.iter()) {
            if let Some(value) = row[idx].as_f64() {
                cell.numerator += value;
                cell.denominator += pop;
            }
        }
    }

    groups.sort_by(|a, b| a.key.cmp(&b.key));

    log::debug!(
        "aggregate [{}] by [{}] where {filter}: {matched} of {} rows in {} groups",
        value_columns.join(", "),
        group_by.join(", "),
        dataset.row_count(),
        groups.len()
    );

    Ok(RateTable {
        group_columns: group_by.iter().map(|c| c.to_string()).collect(),
        value_columns: value_columns.iter().map(|c| c.to_string()).collect(),
        rows: groups,
    })
}

fn numeric_column_idx(dataset: &Dataset, column: &str) -> RateResult<usize> {
    let idx = dataset
        .column_idx(column)
        .ok_or_else(|| RateError::unknown_column(column))?;
    match dataset.column_type(idx) {
        Some(ColumnType::Number) => Ok(idx),
        _ => Err(RateError::non_numeric_column(column)),
    }
}
