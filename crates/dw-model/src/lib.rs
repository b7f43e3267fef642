//! Warehouse data model.
//!
//! Holds everything the builders are parameterized by: the per-table schema
//! descriptors in [`catalog`], the named table collections passed between
//! pipeline stages in [`tables`], and the run configuration in [`config`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod tables;

pub use catalog::{
    ColumnKind, ColumnRef, DateRef, DerivedMeasure, DimensionSpec, FactSpec, ForeignKey, Formula,
    JoinStep, Lookup, Measure, ObtColumn,
};
pub use config::{CalendarConfig, CalendarLocale, DateSource, PipelineConfig};
pub use error::{ModelError, Result};
pub use tables::{RawProvider, TableSet};
