//! Raw extract ingestion.
//!
//! Every `*.csv` in the raw directory becomes one table of a [`TableSet`],
//! named after the file stem.

pub mod discovery;
pub mod error;
pub mod reader;

use std::path::Path;
use std::time::Instant;

use dw_model::TableSet;
use tracing::{debug, info};

pub use discovery::{list_csv_files, table_name};
pub use error::{IngestError, Result};
pub use reader::{read_csv_table, validate_encoding};

/// Load every CSV of `dir` into a [`TableSet`] keyed by file stem.
pub fn load_raw_tables(dir: &Path) -> Result<TableSet> {
    let start = Instant::now();
    let mut tables = TableSet::new();

    for path in list_csv_files(dir)? {
        let Some(name) = table_name(&path) else {
            debug!(path = %path.display(), "skipping file without a usable name");
            continue;
        };
        if tables.contains(&name) {
            return Err(IngestError::DuplicateTable { table: name, path });
        }
        let df = read_csv_table(&path)?;
        debug!(
            table = %name,
            rows = df.height(),
            columns = df.width(),
            path = %path.display(),
            "loaded raw table"
        );
        tables.insert(name, df);
    }

    info!(
        dir = %dir.display(),
        tables = tables.len(),
        duration_ms = start.elapsed().as_millis(),
        "loaded raw extract"
    );
    Ok(tables)
}
