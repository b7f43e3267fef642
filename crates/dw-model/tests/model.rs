//! Tests for dw-model types.

use std::fs;

use dw_model::catalog::{DIMENSIONS, FACTS, OBT_COLUMNS, OBT_JOIN_PLAN};
use dw_model::{CalendarLocale, ModelError, PipelineConfig, RawProvider, TableSet};
use polars::prelude::*;

fn frame(name: &str, values: &[&str]) -> DataFrame {
    let column: Column = Series::new(name.into(), values.to_vec()).into();
    DataFrame::new(vec![column]).expect("frame")
}

#[test]
fn table_set_is_ordered_by_name() {
    let mut tables = TableSet::new();
    tables.insert("sales_order", frame("order_id", &["o1"]));
    tables.insert("customer", frame("customer_id", &["c1", "c2"]));

    assert_eq!(
        tables.names().collect::<Vec<_>>(),
        vec!["customer", "sales_order"]
    );
    assert_eq!(tables.len(), 2);
    assert!(tables.contains("customer"));
    let provided = RawProvider::get(&tables, "customer").expect("customer");
    assert_eq!(provided.height(), 2);
    assert!(RawProvider::get(&tables, "store").is_none());
}

#[test]
fn table_set_collects_from_pairs() {
    let tables: TableSet = vec![
        ("b".to_string(), frame("x", &["1"])),
        ("a".to_string(), frame("x", &["1", "2"])),
    ]
    .into_iter()
    .collect();
    let heights: Vec<(&str, usize)> = tables
        .iter()
        .map(|(name, df)| (name, df.height()))
        .collect();
    assert_eq!(heights, vec![("a", 2), ("b", 1)]);
}

#[test]
fn config_loads_from_json_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pipeline.json");
    fs::write(
        &path,
        r#"{"raw_dir": "extract", "accepted_statuses": ["paid"], "calendar": {"locale": "spanish"}}"#,
    )
    .expect("write config");

    let config = PipelineConfig::from_json_file(&path).expect("load config");
    assert_eq!(config.raw_dir.to_str(), Some("extract"));
    assert_eq!(config.output_dir.to_str(), Some("DW"));
    assert!(config.is_accepted_status("PAID"));
    assert!(!config.is_accepted_status("FULFILLED"));
    assert_eq!(config.calendar.locale, CalendarLocale::Spanish);
}

#[test]
fn config_reports_missing_and_malformed_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        PipelineConfig::from_json_file(&missing),
        Err(ModelError::ConfigRead { .. })
    ));

    let malformed = dir.path().join("bad.json");
    fs::write(&malformed, "{ not json").expect("write config");
    assert!(matches!(
        PipelineConfig::from_json_file(&malformed),
        Err(ModelError::ConfigParse { .. })
    ));
}

#[test]
fn catalog_outputs_are_unique() {
    let mut names: Vec<&str> = DIMENSIONS.iter().map(|d| d.name).collect();
    names.extend(FACTS.iter().map(|f| f.name));
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn join_plan_left_keys_are_available_when_used() {
    // Each step's left key is either produced by the fact join or brought in by
    // an earlier step.
    let mut available: Vec<String> = FACTS
        .iter()
        .take(2)
        .flat_map(|fact| fact.output_columns())
        .map(str::to_string)
        .collect();
    for step in OBT_JOIN_PLAN {
        assert!(
            available.iter().any(|c| c == step.left_key),
            "{} not available for {}",
            step.left_key,
            step.dimension
        );
        available.extend(step.columns.iter().map(|(_, out)| step.output_name(out)));
    }
}

#[test]
fn obt_projection_covers_role_columns() {
    for role in ["store", "billing", "shipping"] {
        for suffix in ["city", "province_name", "province_code"] {
            let name = format!("{role}_{suffix}");
            assert!(
                OBT_COLUMNS.iter().any(|c| c.name == name),
                "missing {name}"
            );
        }
    }
}
