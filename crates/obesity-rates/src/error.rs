pub type RateResult<T> = Result<T, RateError>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// A selection literal is outside its recognized domain.
    #[error("invalid {dimension} selection: {reason}")]
    InvalidSelection { dimension: String, reason: String },

    /// A grouping, value or filter column is missing from the dataset (or has the wrong type).
    #[error("invalid column {column}: {reason}")]
    InvalidColumn { column: String, reason: &'static str },
}

impl RateError {
    pub(crate) fn selection(dimension: &str, reason: impl Into<String>) -> Self {
        RateError::InvalidSelection {
            dimension: dimension.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_column(column: &str) -> Self {
        RateError::InvalidColumn {
            column: column.to_string(),
            reason: "no such column in dataset",
        }
    }

    pub(crate) fn non_numeric_column(column: &str) -> Self {
        RateError::InvalidColumn {
            column: column.to_string(),
            reason: "column is not numeric",
        }
    }
}
