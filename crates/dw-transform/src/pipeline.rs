//! Stage orchestration: dimensions, then facts, then the one-big-table.
//!
//! A [`Pipeline`] builds each stage at most once and reuses it for later
//! stages, so `dims`, `facts` and `obt` run in sequence share their work.
//!
//! # Example
//!
//! ```ignore
//! use dw_transform::Pipeline;
//!
//! let mut pipeline = Pipeline::new(&raw, &config);
//! let obt = pipeline.one_big_table()?;
//! ```

use dw_model::{PipelineConfig, RawProvider, TableSet};
use polars::prelude::DataFrame;
use tracing::info;

use crate::dimension::build_dimensions;
use crate::error::Result;
use crate::fact::build_facts;
use crate::obt::build_obt;

/// Every table produced by a full run.
#[derive(Debug, Clone)]
pub struct Warehouse {
    pub dimensions: TableSet,
    pub facts: TableSet,
    pub one_big_table: DataFrame,
}

/// Lazily built, cached pipeline stages over one raw snapshot.
pub struct Pipeline<'a, P: RawProvider + ?Sized> {
    raw: &'a P,
    config: &'a PipelineConfig,
    dimensions: Option<TableSet>,
    facts: Option<TableSet>,
    one_big_table: Option<DataFrame>,
}

impl<'a, P: RawProvider + ?Sized> Pipeline<'a, P> {
    pub fn new(raw: &'a P, config: &'a PipelineConfig) -> Self {
        Self {
            raw,
            config,
            dimensions: None,
            facts: None,
            one_big_table: None,
        }
    }

    /// Use `dimensions` instead of building them (for example an empty set,
    /// which leaves every fact foreign key null).
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: TableSet) -> Self {
        self.dimensions = Some(dimensions);
        self.facts = None;
        self.one_big_table = None;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    pub fn dimensions(&mut self) -> Result<&TableSet> {
        if self.dimensions.is_none() {
            let dimensions = build_dimensions(self.raw, self.config)?;
            info!(tables = dimensions.len(), "dimensions ready");
            self.dimensions = Some(dimensions);
        }
        Ok(self.dimensions.get_or_insert_with(TableSet::new))
    }

    pub fn facts(&mut self) -> Result<&TableSet> {
        if self.facts.is_none() {
            self.dimensions()?;
            let dimensions = self.dimensions.get_or_insert_with(TableSet::new);
            let facts = build_facts(self.raw, dimensions)?;
            info!(tables = facts.len(), "facts ready");
            self.facts = Some(facts);
        }
        Ok(self.facts.get_or_insert_with(TableSet::new))
    }

    pub fn one_big_table(&mut self) -> Result<&DataFrame> {
        if self.one_big_table.is_none() {
            self.facts()?;
            let dimensions = self.dimensions.get_or_insert_with(TableSet::new);
            let facts = self.facts.get_or_insert_with(TableSet::new);
            let obt = build_obt(self.raw, dimensions, facts, self.config)?;
            self.one_big_table = Some(obt);
        }
        Ok(self.one_big_table.get_or_insert_with(DataFrame::empty))
    }

    /// Build every stage and hand over the tables.
    pub fn run(mut self) -> Result<Warehouse> {
        self.one_big_table()?;
        Ok(Warehouse {
            dimensions: self.dimensions.unwrap_or_default(),
            facts: self.facts.unwrap_or_default(),
            one_big_table: self.one_big_table.unwrap_or_else(DataFrame::empty),
        })
    }
}
