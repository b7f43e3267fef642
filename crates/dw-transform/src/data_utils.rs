//! DataFrame helpers shared by the builders.
//!
//! Raw extracts are loosely structured, so most helpers here tolerate absent
//! columns and return an empty or null result instead of failing.

use std::collections::HashSet;

use dw_common::{any_to_f64, any_to_key, any_to_string};
use dw_model::{ColumnKind, ColumnRef};
use polars::prelude::*;

use crate::error::Result;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Get a string value from a DataFrame column at the given row index.
pub fn column_value_string(df: &DataFrame, name: &str, idx: usize) -> String {
    match df.column(name) {
        Ok(series) => any_to_string(series.get(idx).unwrap_or(AnyValue::Null)),
        Err(_) => String::new(),
    }
}

/// Join keys of every row of a column, or `None` when the column is absent.
pub fn column_keys(df: &DataFrame, name: &str) -> Option<Vec<Option<String>>> {
    let series = df.column(name).ok()?;
    Some(
        (0..df.height())
            .map(|idx| any_to_key(series.get(idx).unwrap_or(AnyValue::Null)))
            .collect(),
    )
}

/// Numeric view of a column; unparseable cells are `None`.
pub fn column_f64(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let series = df.column(name).ok()?;
    Some(
        (0..df.height())
            .map(|idx| any_to_f64(series.get(idx).unwrap_or(AnyValue::Null)))
            .collect(),
    )
}

/// Replace (or add) a `Float64` column.
pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// All-null column of the given logical type.
pub fn null_column(name: &str, len: usize, kind: ColumnKind) -> Column {
    Series::full_null(name.into(), len, &kind.dtype()).into_column()
}

/// Add an all-null column when `name` is absent. Returns whether it was added.
pub fn ensure_column(df: &mut DataFrame, name: &str, kind: ColumnKind) -> Result<bool> {
    if has_column(df, name) {
        return Ok(false);
    }
    let height = df.height();
    df.with_column(null_column(name, height, kind))?;
    Ok(true)
}

/// Rename `from` to `to` when `from` exists, replacing any existing `to`.
pub fn rename_column(df: &mut DataFrame, from: &str, to: &str) -> Result<bool> {
    if from == to || !has_column(df, from) {
        return Ok(false);
    }
    if has_column(df, to) {
        *df = df.drop(to)?;
    }
    df.rename(from, to.into())?;
    Ok(true)
}

/// Rename the first present alias of `column` to its canonical name.
///
/// Returns the source name that was used, or `None` when no candidate exists.
pub fn resolve_alias(df: &mut DataFrame, column: &ColumnRef) -> Result<Option<&'static str>> {
    let Some(found) = column.candidates().find(|name| has_column(df, name)) else {
        return Ok(None);
    };
    rename_column(df, found, column.name)?;
    Ok(Some(found))
}

/// Project onto `columns`, silently skipping the ones that are absent.
pub fn select_existing<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    let present: Vec<&str> = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| has_column(df, name))
        .collect();
    Ok(df.select(present)?)
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Rows where every listed column has a non-blank key.
pub fn complete_rows_mask(df: &DataFrame, columns: &[&str]) -> Vec<bool> {
    let keys: Vec<Vec<Option<String>>> = columns
        .iter()
        .map(|name| column_keys(df, name).unwrap_or_else(|| vec![None; df.height()]))
        .collect();
    (0..df.height())
        .map(|idx| keys.iter().all(|column| column[idx].is_some()))
        .collect()
}

/// Drop exact duplicate rows, keeping the first occurrence.
pub fn distinct_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }
    let columns = df.get_columns();
    let mut seen = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = (0..df.height())
        .map(|idx| {
            let row: Vec<Option<String>> = columns
                .iter()
                .map(|column| match column.get(idx).unwrap_or(AnyValue::Null) {
                    AnyValue::Null => None,
                    value => Some(any_to_string(value)),
                })
                .collect();
            seen.insert(row)
        })
        .collect();
    if keep.iter().all(|kept| *kept) {
        return Ok(df.clone());
    }
    filter_rows(df, &keep)
}

/// Keep the first row per key of `column`. Rows without a key are kept.
pub fn distinct_on(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let Some(keys) = column_keys(df, column) else {
        return Ok(df.clone());
    };
    let mut seen = HashSet::with_capacity(keys.len());
    let keep: Vec<bool> = keys
        .into_iter()
        .map(|key| key.is_none_or(|key| seen.insert(key)))
        .collect();
    if keep.iter().all(|kept| *kept) {
        return Ok(df.clone());
    }
    filter_rows(df, &keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: Vec<Column>) -> DataFrame {
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn distinct_rows_keeps_first_occurrence() {
        let df = frame(vec![
            Series::new("id".into(), vec![1i64, 1, 2, 1]).into(),
            Series::new("name".into(), vec!["a", "a", "b", "c"]).into(),
        ]);
        let out = distinct_rows(&df).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(column_value_string(&out, "name", 2), "c");
    }

    #[test]
    fn distinct_rows_separates_null_from_empty() {
        let df = frame(vec![
            Series::new("v".into(), vec![None, Some(""), None]).into(),
        ]);
        assert_eq!(distinct_rows(&df).unwrap().height(), 2);
    }

    #[test]
    fn distinct_on_matches_rendered_keys() {
        let df = frame(vec![
            Series::new("id".into(), vec![Some("7"), Some("7.0"), None, None, Some("8")]).into(),
        ]);
        let out = distinct_on(&df, "id").unwrap();
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn aliases_rename_first_present_candidate() {
        let mut df = frame(vec![
            Series::new("id".into(), vec!["r1"]).into(),
            Series::new("nps_id".into(), vec!["r2"]).into(),
        ]);
        let column = ColumnRef::with_aliases("response_id", &["nps_id", "id"]);
        assert_eq!(resolve_alias(&mut df, &column).unwrap(), Some("nps_id"));
        assert_eq!(column_value_string(&df, "response_id", 0), "r2");
        assert!(has_column(&df, "id"));
    }

    #[test]
    fn select_existing_skips_absent_columns() {
        let df = frame(vec![
            Series::new("a".into(), vec![1i64]).into(),
            Series::new("b".into(), vec![2i64]).into(),
        ]);
        let out = select_existing(&df, &["b", "missing", "a"]).unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn ensure_column_adds_typed_nulls_once() {
        let mut df = frame(vec![Series::new("a".into(), vec![1i64, 2]).into()]);
        assert!(ensure_column(&mut df, "flag", ColumnKind::Boolean).unwrap());
        assert!(!ensure_column(&mut df, "flag", ColumnKind::Boolean).unwrap());
        let flag = df.column("flag").unwrap();
        assert_eq!(flag.dtype(), &DataType::Boolean);
        assert_eq!(flag.null_count(), 2);
    }

    #[test]
    fn complete_rows_treats_blank_as_missing() {
        let df = frame(vec![
            Series::new("a".into(), vec![Some("x"), Some(" "), None, Some("y")]).into(),
        ]);
        assert_eq!(
            complete_rows_mask(&df, &["a"]),
            vec![true, false, false, true]
        );
    }
}
