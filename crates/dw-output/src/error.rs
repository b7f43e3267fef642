//! Error types for writing warehouse tables.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while writing the warehouse directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutputError {
    /// Failed to create the output directory.
    #[error("failed to create output directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the output file.
    #[error("failed to create {path}: {source}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a table.
    #[error("failed to write {format} file '{path}': {message}")]
    WriteError {
        format: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Table name cannot be used as a file name.
    #[error("invalid table name '{name}'")]
    InvalidTableName { name: String },
}

/// Result type alias for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

impl OutputError {
    /// Create a write error with format and path context.
    pub fn write_error(
        format: &'static str,
        path: impl Into<PathBuf>,
        source: impl std::fmt::Display,
    ) -> Self {
        Self::WriteError {
            format,
            path: path.into(),
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_keeps_context() {
        let err = OutputError::write_error("CSV", "DW/dim_date.csv", "disk full");
        assert_eq!(
            err.to_string(),
            "failed to write CSV file 'DW/dim_date.csv': disk full"
        );
    }
}
