//! Warehouse output.
//!
//! Every built table is materialized in full and written as one CSV file with
//! a header row; the one-big-table lands in `one_big_table.csv`.

pub mod error;
pub mod sink;

pub use error::{OutputError, Result};
pub use sink::{CsvSink, WrittenTable};
