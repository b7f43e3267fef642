//! CSV sink for built tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use dw_model::TableSet;
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{OutputError, Result};

/// One table that landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub path: PathBuf,
}

/// Writes each table to `<dir>/<name>.csv` with a header row.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a table named `name` is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| OutputError::DirectoryCreate {
            path: self.dir.clone(),
            source,
        })
    }

    /// Write one table, replacing any previous file of the same name.
    pub fn write(&self, name: &str, df: &DataFrame) -> Result<WrittenTable> {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(OutputError::InvalidTableName {
                name: name.to_string(),
            });
        }
        self.ensure_dir()?;

        let path = self.path_for(name);
        let file = File::create(&path).map_err(|source| OutputError::FileCreate {
            path: path.clone(),
            source,
        })?;
        // CsvWriter needs a mutable frame.
        let mut df = df.clone();
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| OutputError::write_error("CSV", &path, e))?;

        debug!(table = name, rows = df.height(), path = %path.display(), "wrote table");
        Ok(WrittenTable {
            name: name.to_string(),
            rows: df.height(),
            columns: df.width(),
            path,
        })
    }

    /// Write every table of `tables`, in name order.
    pub fn write_all(&self, tables: &TableSet) -> Result<Vec<WrittenTable>> {
        let mut written = Vec::with_capacity(tables.len());
        for (name, df) in tables.iter() {
            written.push(self.write(name, df)?);
        }
        info!(
            dir = %self.dir.display(),
            tables = written.len(),
            "wrote tables"
        );
        Ok(written)
    }
}
