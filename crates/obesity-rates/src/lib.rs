//! Filter normalization and population-weighted rate aggregation.
//!
//! A request flows through two steps:
//! - [`Selection`] (year or year range, sex, regions, income groups) is normalized into a
//!   [`NormalizedFilter`]: a map from column name to the set of admissible values.
//! - [`aggregate`] restricts a [`obesity_model::Dataset`] to the filtered rows, partitions them by
//!   the grouping columns and computes `sum(value) / sum(pop)` per group and value column,
//!   skipping rows where either side is missing independently for each value column.
//!
//! The [`views`] module shapes rate tables for the dashboard charts.

#![forbid(unsafe_code)]

mod aggregate;
mod error;
mod filter;
mod selection;
pub mod views;

pub use crate::aggregate::{aggregate, RateCell, RateRow, RateTable};
pub use crate::error::{RateError, RateResult};
pub use crate::filter::NormalizedFilter;
pub use crate::selection::{SexSelection, Selection, YearSelection};
pub use crate::views::{Grouping, Variable};
