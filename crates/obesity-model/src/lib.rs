//! In-memory dataset model for the obesity explorer.
//!
//! This crate focuses on:
//! - A typed, row-oriented table of country/year statistics ([`Dataset`]).
//! - CSV import with column type inference over every record ([`import_csv`]).
//! - An immutable snapshot handle that can be swapped atomically on refresh ([`DatasetHandle`]).

#![forbid(unsafe_code)]

pub mod columns;
mod dataset;
mod import;
mod snapshot;
mod value;

pub use crate::dataset::{ColumnSchema, ColumnType, Dataset, DatasetError, DatasetResult};
pub use crate::import::{import_csv, import_csv_path, CsvOptions};
pub use crate::snapshot::DatasetHandle;
pub use crate::value::Value;
