//! Generic surrogate-keyed dimension builder.
//!
//! One algorithm, parameterized by a [`DimensionSpec`] from the catalog:
//! dedupe, rename the natural key to the business key, enrich through lookups,
//! assign a dense 1-based surrogate key, then project.

use std::time::Instant;

use dw_model::catalog::{DIM_DATE, DIMENSIONS};
use dw_model::{ColumnKind, DimensionSpec, Lookup, PipelineConfig, RawProvider, TableSet};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::calendar::build_date_dimension;
use crate::data_utils::{
    complete_rows_mask, distinct_on, distinct_rows, ensure_column, filter_rows, has_column,
    rename_column, select_existing,
};
use crate::error::{Result, TransformError};
use crate::join::safe_join;

/// Build one dimension.
///
/// Returns `Ok(None)` only for an optional dimension whose base table is
/// absent.
pub fn build_dimension<P>(raw: &P, spec: &DimensionSpec) -> Result<Option<DataFrame>>
where
    P: RawProvider + ?Sized,
{
    let start = Instant::now();
    let Some(base) = raw.get(spec.source) else {
        if spec.optional {
            warn!(
                table = spec.name,
                source = spec.source,
                "optional source table absent, skipping dimension"
            );
            return Ok(None);
        }
        return Err(TransformError::MissingSourceTable {
            table: spec.source.to_string(),
        });
    };
    if !has_column(base, spec.natural_key) {
        return Err(TransformError::MissingRequiredColumn {
            table: spec.source.to_string(),
            column: spec.natural_key.to_string(),
        });
    }

    let mut df = distinct_rows(base)?;
    let business_key = spec.business_key();
    rename_column(&mut df, spec.natural_key, &business_key)?;
    for (from, to) in spec.renames {
        rename_column(&mut df, from, to)?;
    }

    let keyed = complete_rows_mask(&df, &[business_key.as_str()]);
    let blank = keyed.iter().filter(|kept| !**kept).count();
    if blank > 0 {
        warn!(
            table = spec.name,
            rows = blank,
            "dropping rows without a business key"
        );
        df = filter_rows(&df, &keyed)?;
    }
    let before = df.height();
    df = distinct_on(&df, &business_key)?;
    if df.height() < before {
        warn!(
            table = spec.name,
            rows = before - df.height(),
            "dropping conflicting duplicates of a business key"
        );
    }

    for lookup in spec.lookups {
        df = enrich(&df, raw, spec, lookup)?;
    }

    let surrogate_key = spec.surrogate_key();
    let keys: Vec<i64> = (1..=df.height() as i64).collect();
    df.with_column(Series::new(surrogate_key.as_str().into(), keys))?;

    let df = select_existing(&df, spec.columns)?;
    info!(
        table = spec.name,
        rows = df.height(),
        columns = df.width(),
        duration_ms = start.elapsed().as_millis(),
        "built dimension"
    );
    Ok(Some(df))
}

/// Join one lookup onto the dimension, or null-fill its targets when the
/// lookup cannot be applied.
fn enrich<P>(df: &DataFrame, raw: &P, spec: &DimensionSpec, lookup: &Lookup) -> Result<DataFrame>
where
    P: RawProvider + ?Sized,
{
    let usable = raw
        .get(lookup.table)
        .filter(|table| has_column(table, lookup.key) && has_column(df, lookup.key));
    let Some(table) = usable else {
        warn!(
            table = spec.name,
            lookup = lookup.table,
            key = lookup.key,
            "lookup unavailable, attributes will be null"
        );
        return null_fill(df.clone(), lookup);
    };

    // Columns the dimension already carries win over the lookup.
    let wanted: Vec<(&str, &str)> = lookup
        .columns
        .iter()
        .copied()
        .filter(|(source, target)| has_column(table, source) && !has_column(df, target))
        .collect();
    let mut projection = vec![lookup.key];
    projection.extend(wanted.iter().map(|(source, _)| *source));
    projection.dedup();
    let mut right = distinct_on(&select_existing(table, &projection)?, lookup.key)?;

    // Two targets may share one source; materialize every target explicitly.
    let mut renamed: Vec<Column> = vec![right.column(lookup.key)?.clone()];
    for (source, target) in &wanted {
        renamed.push(right.column(source)?.clone().with_name((*target).into()));
    }
    right = DataFrame::new(renamed)?;

    debug!(
        table = spec.name,
        lookup = lookup.table,
        rows = right.height(),
        "enriching dimension"
    );
    let joined = safe_join(df, Some(&right), &[lookup.key])?;
    null_fill(joined, lookup)
}

fn null_fill(mut df: DataFrame, lookup: &Lookup) -> Result<DataFrame> {
    for (_, target) in lookup.columns {
        ensure_column(&mut df, target, ColumnKind::Text)?;
    }
    Ok(df)
}

/// Build every catalog dimension plus the calendar dimension.
pub fn build_dimensions<P>(raw: &P, config: &PipelineConfig) -> Result<TableSet>
where
    P: RawProvider + ?Sized,
{
    let mut dims = TableSet::new();
    for spec in DIMENSIONS {
        if let Some(df) = build_dimension(raw, spec)? {
            dims.insert(spec.name, df);
        }
    }
    dims.insert(DIM_DATE, build_date_dimension(raw, &config.calendar)?);
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use dw_model::catalog::{ADDRESS, CUSTOMER, PROVINCE, STORE};

    use super::*;
    use crate::data_utils::column_value_string;

    fn strings(name: &str, values: &[Option<&str>]) -> Column {
        Series::new(name.into(), values.to_vec()).into()
    }

    fn customers() -> DataFrame {
        DataFrame::new(vec![
            strings("customer_id", &[Some("c1"), Some("c2"), Some("c1"), None, Some("c2")]),
            strings("email", &[Some("a@x"), Some("b@x"), Some("a@x"), Some("n@x"), Some("z@x")]),
        ])
        .unwrap()
    }

    #[test]
    fn surrogate_keys_are_dense_after_dedupe() {
        let raw = TableSet::new().with_table("customer", customers());
        let df = build_dimension(&raw, &CUSTOMER).unwrap().unwrap();
        assert_eq!(df.height(), 2);
        let sks: Vec<i64> = df
            .column("customer_sk")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(sks, vec![1, 2]);
        assert_eq!(column_value_string(&df, "customer_bk", 1), "c2");
        // First occurrence wins for conflicting duplicates.
        assert_eq!(column_value_string(&df, "email", 1), "b@x");
        assert!(!has_column(&df, "customer_id"));
    }

    #[test]
    fn lookalike_text_keys_stay_distinct() {
        let df = DataFrame::new(vec![strings(
            "customer_id",
            &[Some("007"), Some("7"), Some("1e3"), Some("1000"), Some(" 7 ")],
        )])
        .unwrap();
        let raw = TableSet::new().with_table("customer", df);
        let dim = build_dimension(&raw, &CUSTOMER).unwrap().unwrap();
        assert_eq!(dim.height(), 4);
        let bks: Vec<String> = (0..dim.height())
            .map(|idx| column_value_string(&dim, "customer_bk", idx))
            .collect();
        assert_eq!(bks, vec!["007", "7", "1e3", "1000"]);
    }

    #[test]
    fn missing_base_table_fails_unless_optional() {
        let raw = TableSet::new();
        assert!(matches!(
            build_dimension(&raw, &CUSTOMER),
            Err(TransformError::MissingSourceTable { table }) if table == "customer"
        ));
        assert!(build_dimension(&raw, &PROVINCE).unwrap().is_none());
    }

    #[test]
    fn missing_natural_key_is_reported() {
        let df = DataFrame::new(vec![strings("email", &[Some("a@x")])]).unwrap();
        let raw = TableSet::new().with_table("customer", df);
        assert!(matches!(
            build_dimension(&raw, &CUSTOMER),
            Err(TransformError::MissingRequiredColumn { column, .. }) if column == "customer_id"
        ));
    }

    #[test]
    fn store_chains_address_then_province() {
        let raw = TableSet::new()
            .with_table(
                "store",
                DataFrame::new(vec![
                    strings("store_id", &[Some("s1"), Some("s2")]),
                    strings("name", &[Some("Centro"), Some("Norte")]),
                    strings("address_id", &[Some("a1"), Some("a9")]),
                ])
                .unwrap(),
            )
            .with_table(
                "address",
                DataFrame::new(vec![
                    strings("address_id", &[Some("a1"), Some("a1")]),
                    strings("city", &[Some("La Plata"), Some("Duplicate")]),
                    strings("province_id", &[Some("p1"), Some("p1")]),
                ])
                .unwrap(),
            )
            .with_table(
                "province",
                DataFrame::new(vec![
                    strings("province_id", &[Some("p1")]),
                    strings("name", &[Some("Buenos Aires")]),
                    strings("code", &[Some("BA")]),
                ])
                .unwrap(),
            );
        let df = build_dimension(&raw, &STORE).unwrap().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(column_value_string(&df, "name", 0), "Centro");
        assert_eq!(column_value_string(&df, "city", 0), "La Plata");
        assert_eq!(column_value_string(&df, "province_name", 0), "Buenos Aires");
        assert_eq!(column_value_string(&df, "province_code", 0), "BA");
        assert_eq!(column_value_string(&df, "province_name", 1), "");
    }

    #[test]
    fn absent_lookup_yields_null_attributes() {
        let raw = TableSet::new().with_table(
            "address",
            DataFrame::new(vec![
                strings("address_id", &[Some("a1")]),
                strings("province_id", &[Some("p1")]),
            ])
            .unwrap(),
        );
        let df = build_dimension(&raw, &ADDRESS).unwrap().unwrap();
        for column in ["province_name", "province_code"] {
            assert_eq!(df.column(column).unwrap().null_count(), 1, "{column}");
        }
    }

    #[test]
    fn build_dimensions_includes_calendar() {
        let raw = TableSet::new()
            .with_table("customer", customers())
            .with_table(
                "product",
                DataFrame::new(vec![strings("product_id", &[Some("p1")])]).unwrap(),
            )
            .with_table(
                "store",
                DataFrame::new(vec![strings("store_id", &[Some("s1")])]).unwrap(),
            )
            .with_table(
                "channel",
                DataFrame::new(vec![strings("channel_id", &[Some("web")])]).unwrap(),
            )
            .with_table(
                "address",
                DataFrame::new(vec![strings("address_id", &[Some("a1")])]).unwrap(),
            );
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let names: Vec<&str> = dims.names().collect();
        assert_eq!(
            names,
            vec![
                "dim_address",
                "dim_channel",
                "dim_customer",
                "dim_date",
                "dim_product",
                "dim_store"
            ]
        );
    }
}
