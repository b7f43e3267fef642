//! Dimensional-model transforms for the warehouse.
//!
//! - **join**: [`safe_join`], the single degrade-gracefully join primitive
//! - **dimension**: surrogate-keyed dimension builder driven by the catalog
//! - **calendar**: the derived date dimension
//! - **fact**: event-grain fact builder with foreign-key resolution
//! - **obt**: the one-big-table assembler
//! - **pipeline**: stage orchestration with reuse of built tables

pub mod calendar;
pub mod data_utils;
pub mod datetime;
pub mod dimension;
pub mod error;
pub mod fact;
pub mod join;
pub mod obt;
pub mod pipeline;

pub use calendar::{CalendarDay, build_date_dimension, date_sk};
pub use dimension::{build_dimension, build_dimensions};
pub use error::{Result, TransformError};
pub use fact::{build_fact, build_facts};
pub use join::{JoinHow, JoinOptions, safe_join, safe_join_with};
pub use obt::build_obt;
pub use pipeline::{Pipeline, Warehouse};
