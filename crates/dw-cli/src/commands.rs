use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use dw_ingest::load_raw_tables;
use dw_model::catalog::{DIM_DATE, DIMENSIONS, FACTS, ONE_BIG_TABLE, SALES_ORDER_ITEM};
use dw_model::{PipelineConfig, TableSet};
use dw_output::CsvSink;
use dw_transform::Pipeline;
use tracing::{info, info_span};

use crate::cli::{Command, RunArgs};
use crate::summary::apply_table_style;
use crate::types::{CatalogEntry, StepResult, TableKind, TableSummary};

/// A step that builds and writes tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Dims,
    Facts { empty_dims: bool },
    Obt,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Dims => "dims",
            Step::Facts { .. } => "facts",
            Step::Obt => "obt",
        }
    }

    /// Steps a command runs, in order. `tables` runs none.
    pub fn for_command(command: Command) -> Vec<Step> {
        match command {
            Command::Dims => vec![Step::Dims],
            Command::Facts { empty_dims } => vec![Step::Facts { empty_dims }],
            Command::Obt => vec![Step::Obt],
            Command::All => vec![Step::Dims, Step::Facts { empty_dims: false }, Step::Obt],
            Command::Tables => Vec::new(),
        }
    }
}

/// Layer the config file (if any) and the CLI flags over the defaults.
pub fn resolve_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.raw_dir {
        config = config.with_raw_dir(dir);
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir);
    }
    if !args.accepted_status.is_empty() {
        config = config.with_accepted_statuses(args.accepted_status.clone());
    }
    if let Some(locale) = args.locale {
        config = config.with_locale(locale.into());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Run `steps` over one raw snapshot, sharing built tables between them.
pub fn run_steps(config: &PipelineConfig, steps: &[Step]) -> Result<Vec<StepResult>> {
    let raw = load_raw_tables(&config.raw_dir)
        .with_context(|| format!("load raw extract from {}", config.raw_dir.display()))?;
    let sink = CsvSink::new(&config.output_dir);

    let empty_dims = steps
        .iter()
        .any(|step| matches!(step, Step::Facts { empty_dims: true }));
    let mut pipeline = Pipeline::new(&raw, config);
    if empty_dims {
        pipeline = pipeline.with_dimensions(TableSet::new());
    }

    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let span = info_span!("step", step = step.name());
        let _guard = span.enter();
        let start = Instant::now();
        let tables = execute(&mut pipeline, &sink, *step)?;
        let result = StepResult {
            step: step.name(),
            output_dir: config.output_dir.clone(),
            tables,
        };
        info!(
            tables = result.tables.len(),
            rows = result.total_rows(),
            duration_ms = start.elapsed().as_millis(),
            "step complete"
        );
        results.push(result);
    }
    Ok(results)
}

fn execute(
    pipeline: &mut Pipeline<'_, TableSet>,
    sink: &CsvSink,
    step: Step,
) -> Result<Vec<TableSummary>> {
    let (kind, written) = match step {
        Step::Dims => {
            let dimensions = pipeline.dimensions().context("build dimensions")?;
            let written = sink.write_all(dimensions).context("write dimensions")?;
            (TableKind::Dimension, written)
        }
        Step::Facts { .. } => {
            let facts = pipeline.facts().context("build facts")?;
            let written = sink.write_all(facts).context("write facts")?;
            (TableKind::Fact, written)
        }
        Step::Obt => {
            let obt = pipeline.one_big_table().context("build one-big-table")?;
            let written = sink
                .write(ONE_BIG_TABLE, obt)
                .context("write one-big-table")?;
            (TableKind::OneBigTable, vec![written])
        }
    };
    Ok(written
        .into_iter()
        .map(|table| TableSummary { kind, table })
        .collect())
}

/// Every table the warehouse produces, with the raw table it comes from.
pub fn catalog_entries() -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = DIMENSIONS
        .iter()
        .map(|spec| CatalogEntry {
            name: spec.name,
            kind: TableKind::Dimension,
            source: spec.source,
        })
        .collect();
    entries.push(CatalogEntry {
        name: DIM_DATE,
        kind: TableKind::Dimension,
        source: "(observed dates)",
    });
    entries.extend(FACTS.iter().map(|spec| CatalogEntry {
        name: spec.name,
        kind: TableKind::Fact,
        source: spec.source,
    }));
    entries.push(CatalogEntry {
        name: ONE_BIG_TABLE,
        kind: TableKind::OneBigTable,
        source: SALES_ORDER_ITEM.name,
    });
    entries
}

pub fn run_tables() {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Kind", "Source"]);
    apply_table_style(&mut table);
    for entry in catalog_entries() {
        table.add_row(vec![entry.name, entry.kind.label(), entry.source]);
    }
    println!("{table}");
}
