//! Shared utilities for the warehouse crates.
//!
//! This crate provides the polars `AnyValue` helpers every builder relies on:
//! rendering cells as text, coercing measures to numbers, and turning key
//! cells into comparable join keys.

pub mod values;

pub use values::{any_to_f64, any_to_key, any_to_string, format_numeric, parse_f64};
