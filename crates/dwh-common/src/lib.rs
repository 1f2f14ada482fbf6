//! Shared utilities for the dwh crates.
//!
//! Locale-invariant number parsing and formatting, plus Polars `AnyValue`
//! helpers used when profiling normalized tables.

pub mod numeric;
pub mod polars;

pub use numeric::{format_numeric, parse_f64, parse_key};
pub use polars::any_to_string;
