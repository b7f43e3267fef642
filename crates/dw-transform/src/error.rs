//! Error types for the warehouse builders.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while building dimensions, facts or the one-big-table.
///
/// Degraded enrichment (an absent lookup table or optional column) is never an
/// error; it is logged and the affected attributes are null.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A mandatory raw table is absent.
    #[error("raw table '{table}' not found")]
    MissingSourceTable { table: String },

    /// A mandatory column is absent from a present raw table.
    #[error("required column '{column}' not found in raw table '{table}'")]
    MissingRequiredColumn { table: String, column: String },

    /// A builder produced zero rows.
    #[error("{table} has no rows after dropping incomplete records")]
    EmptyResult { table: String },

    /// A mandatory fact grain for the one-big-table is absent or empty.
    #[error("base fact '{table}' is missing or empty")]
    EmptyBaseFact { table: String },

    /// A strict join was requested on a key one side does not carry.
    #[error("join key '{key}' is missing from one side of a strict join")]
    MissingJoinKey { key: String },

    #[error("DataFrame operation failed: {0}")]
    DataFrame(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
