use std::path::PathBuf;

use dw_output::WrittenTable;

/// Which layer of the warehouse a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Dimension,
    Fact,
    OneBigTable,
}

impl TableKind {
    pub fn label(self) -> &'static str {
        match self {
            TableKind::Dimension => "dimension",
            TableKind::Fact => "fact",
            TableKind::OneBigTable => "one-big-table",
        }
    }
}

#[derive(Debug)]
pub struct TableSummary {
    pub kind: TableKind,
    pub table: WrittenTable,
}

/// Outcome of one CLI step.
#[derive(Debug)]
pub struct StepResult {
    pub step: &'static str,
    pub output_dir: PathBuf,
    pub tables: Vec<TableSummary>,
}

impl StepResult {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|summary| summary.table.rows).sum()
    }
}

/// One row of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub kind: TableKind,
    pub source: &'static str,
}
