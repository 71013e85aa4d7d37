//! Command-line front end for the obesity explorer.
//!
//! Loads the processed dataset once, normalizes the selection flags and prints one of the
//! dashboard views as an aligned text table, JSON records or CSV.

#![forbid(unsafe_code)]

pub mod cli;
pub mod report;
