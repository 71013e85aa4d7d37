use crate::error::{RateError, RateResult};
use obesity_model::{Dataset, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Canonical row-selection intent: column name → admissible values.
///
/// A row passes when, for every column present, its value is a member of that column's set.
/// Columns that are not present impose no restriction. An empty set matches no rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedFilter {
    columns: BTreeMap<String, BTreeSet<Value>>,
}

impl NormalizedFilter {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn with_column_equals(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_column_equals(column, value);
        self
    }

    pub fn with_column_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.set_column_in(column, values);
        self
    }

    pub fn set_column_equals(&mut self, column: &str, value: impl Into<Value>) {
        self.columns
            .insert(column.to_string(), BTreeSet::from([value.into()]));
    }

    /// Replace the admissible set for `column`.
    pub fn set_column_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) {
        self.columns.insert(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        );
    }

    pub fn clear_column(&mut self, column: &str) {
        self.columns.remove(column);
    }

    pub fn admissible(&self, column: &str) -> Option<&BTreeSet<Value>> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &BTreeSet<Value>)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve column names against a dataset schema.
    pub(crate) fn bind<'a>(&'a self, dataset: &Dataset) -> RateResult<BoundFilter<'a>> {
        let tests = self
            .columns
            .iter()
            .map(|(column, allowed)| {
                dataset
                    .column_idx(column)
                    .map(|idx| (idx, allowed))
                    .ok_or_else(|| RateError::unknown_column(column))
            })
            .collect::<RateResult<Vec<_>>>()?;
        Ok(BoundFilter { tests })
    }
}

pub(crate) struct BoundFilter<'a> {
    tests: Vec<(usize, &'a BTreeSet<Value>)>,
}

impl BoundFilter<'_> {
    pub(crate) fn matches(&self, row: &[Value]) -> bool {
        self.tests
            .iter()
            .all(|(idx, allowed)| row.get(*idx).is_some_and(|v| allowed.contains(v)))
    }
}

/// Renders the filter as a membership predicate, e.g. `sex in ["Female", "Male"] and year in
/// [2010, 2011]`. Only used for diagnostics.
impl fmt::Display for NormalizedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return f.write_str("true");
        }
        for (i, (column, values)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{column} in [")?;
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}
