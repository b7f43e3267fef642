//! Generic event-grain fact builder.
//!
//! One algorithm, parameterized by a [`FactSpec`] from the catalog. Measures
//! are coerced to `Float64` and defaulted before derived measures are
//! computed; foreign keys resolve against dimension business keys and dates
//! against the calendar dimension. Business-key columns never survive into
//! the output.

use std::time::Instant;

use dw_model::catalog::{DIM_DATE, FACTS};
use dw_model::{
    ColumnKind, DateRef, DerivedMeasure, FactSpec, ForeignKey, Formula, RawProvider, TableSet,
};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::calendar::date_sk;
use crate::data_utils::{
    column_f64, complete_rows_mask, distinct_on, distinct_rows, ensure_column, filter_rows,
    has_column, resolve_alias, set_f64_column,
};
use crate::datetime::{any_to_date, any_to_datetime};
use crate::error::{Result, TransformError};
use crate::join::safe_join;

const CALENDAR_DAY: &str = "__calendar_day";

/// Build one fact table against the given dimensions.
///
/// Returns `Ok(None)` only for an optional fact whose base table is absent.
/// Dimensions that are not supplied leave their foreign keys null.
pub fn build_fact<P>(raw: &P, spec: &FactSpec, dims: &TableSet) -> Result<Option<DataFrame>>
where
    P: RawProvider + ?Sized,
{
    let start = Instant::now();
    let Some(base) = raw.get(spec.source) else {
        if spec.optional {
            warn!(
                table = spec.name,
                source = spec.source,
                "optional source table absent, skipping fact"
            );
            return Ok(None);
        }
        return Err(TransformError::MissingSourceTable {
            table: spec.source.to_string(),
        });
    };

    let mut df = base.clone();
    check_required_columns(&mut df, spec)?;

    df = distinct_rows(&df)?;
    let before = df.height();
    df = distinct_on(&df, spec.key.name)?;
    if df.height() < before {
        warn!(
            table = spec.name,
            rows = before - df.height(),
            "dropping conflicting duplicates of an event key"
        );
    }

    apply_measures(&mut df, spec)?;
    for derived in spec.derived {
        apply_derived(&mut df, derived)?;
    }

    for fk in spec.foreign_keys {
        df = resolve_foreign_key(df, fk, dims)?;
    }
    for date in spec.dates {
        df = resolve_date(df, date, dims.get(DIM_DATE))?;
    }

    let identifying = spec.identifying_columns();
    let complete = complete_rows_mask(&df, &identifying);
    let incomplete = complete.iter().filter(|kept| !**kept).count();
    if incomplete > 0 {
        warn!(
            table = spec.name,
            rows = incomplete,
            "dropping rows missing identifying columns"
        );
        df = filter_rows(&df, &complete)?;
    }
    if df.height() == 0 {
        return Err(TransformError::EmptyResult {
            table: spec.name.to_string(),
        });
    }

    for (column, kind) in output_kinds(spec) {
        ensure_column(&mut df, column, kind)?;
    }
    let df = df.select(spec.output_columns())?;
    info!(
        table = spec.name,
        rows = df.height(),
        columns = df.width(),
        duration_ms = start.elapsed().as_millis(),
        "built fact"
    );
    Ok(Some(df))
}

/// Build every catalog fact, skipping absent optional ones.
pub fn build_facts<P>(raw: &P, dims: &TableSet) -> Result<TableSet>
where
    P: RawProvider + ?Sized,
{
    let mut facts = TableSet::new();
    for spec in FACTS {
        if let Some(df) = build_fact(raw, spec, dims)? {
            facts.insert(spec.name, df);
        }
    }
    Ok(facts)
}

fn check_required_columns(df: &mut DataFrame, spec: &FactSpec) -> Result<()> {
    let missing = |column: &str| TransformError::MissingRequiredColumn {
        table: spec.source.to_string(),
        column: column.to_string(),
    };
    if resolve_alias(df, &spec.key)?.is_none() {
        return Err(missing(spec.key.name));
    }
    if let Some(parent) = spec.parent_key
        && !has_column(df, parent)
    {
        return Err(missing(parent));
    }
    if let Some(fk) = spec
        .foreign_keys
        .iter()
        .find(|fk| fk.required && !has_column(df, fk.column))
    {
        return Err(missing(fk.column));
    }
    for date in spec.dates {
        if resolve_alias(df, &date.column)?.is_none() && date.required {
            return Err(missing(date.column.name));
        }
    }
    Ok(())
}

fn output_kinds(spec: &FactSpec) -> Vec<(&'static str, ColumnKind)> {
    let mut kinds: Vec<(&'static str, ColumnKind)> = Vec::new();
    kinds.extend(
        spec.foreign_keys
            .iter()
            .map(|fk| (fk.output, ColumnKind::Integer)),
    );
    kinds.extend(spec.dates.iter().map(|date| (date.output, ColumnKind::Integer)));
    kinds.extend(spec.attributes.iter().map(|name| (*name, ColumnKind::Text)));
    kinds.extend(spec.measures.iter().map(|m| (m.column, ColumnKind::Float)));
    kinds.extend(spec.derived.iter().map(|d| (d.target, ColumnKind::Float)));
    kinds
}

/// Coerce measures to `Float64` and apply their defaults to nulls.
fn apply_measures(df: &mut DataFrame, spec: &FactSpec) -> Result<()> {
    let height = df.height();
    for measure in spec.measures {
        let values = column_f64(df, measure.column).unwrap_or_else(|| vec![None; height]);
        let values = match measure.default {
            Some(default) => values.into_iter().map(|v| v.or(Some(default))).collect(),
            None => values,
        };
        set_f64_column(df, measure.column, values)?;
    }
    Ok(())
}

/// Fill a derived measure where it is currently null. Supplied values are
/// never overwritten.
fn apply_derived(df: &mut DataFrame, derived: &DerivedMeasure) -> Result<()> {
    let height = df.height();
    let current = column_f64(df, derived.target).unwrap_or_else(|| vec![None; height]);
    let computed = compute_formula(df, &derived.formula)?;
    let filled = current.iter().filter(|v| v.is_none()).count();
    let values: Vec<Option<f64>> = current
        .into_iter()
        .zip(computed)
        .map(|(current, computed)| current.or(computed))
        .collect();
    debug!(
        target = derived.target,
        candidates = filled,
        "computed derived measure"
    );
    set_f64_column(df, derived.target, values)
}

fn compute_formula(df: &DataFrame, formula: &Formula) -> Result<Vec<Option<f64>>> {
    let height = df.height();
    let numbers = |name: &str| column_f64(df, name).unwrap_or_else(|| vec![None; height]);
    let values = match formula {
        Formula::Sum(columns) => {
            let inputs: Vec<Vec<Option<f64>>> = columns.iter().map(|c| numbers(c)).collect();
            (0..height)
                .map(|idx| inputs.iter().map(|column| column[idx]).sum::<Option<f64>>())
                .collect()
        }
        Formula::NetLine {
            quantity,
            unit_price,
            discount,
        } => {
            let quantity = numbers(quantity);
            let unit_price = numbers(unit_price);
            let discount = numbers(discount);
            (0..height)
                .map(|idx| Some(quantity[idx]? * unit_price[idx]? - discount[idx]?))
                .collect()
        }
        Formula::ElapsedMinutes { start, end } => {
            let (start, end) = (timestamps(df, start)?, timestamps(df, end)?);
            start
                .iter()
                .zip(&end)
                .map(|(start, end)| {
                    let elapsed = end.as_ref()?.signed_duration_since(*start.as_ref()?);
                    Some(elapsed.num_seconds() as f64 / 60.0)
                })
                .collect()
        }
        Formula::ElapsedDays { start, end } => {
            let (start, end) = (timestamps(df, start)?, timestamps(df, end)?);
            start
                .iter()
                .zip(&end)
                .map(|(start, end)| {
                    let elapsed = end.as_ref()?.date().signed_duration_since(start.as_ref()?.date());
                    Some(elapsed.num_days() as f64)
                })
                .collect()
        }
    };
    Ok(values)
}

fn timestamps(df: &DataFrame, name: &str) -> Result<Vec<Option<chrono::NaiveDateTime>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    Ok((0..df.height())
        .map(|idx| any_to_datetime(column.get(idx).unwrap_or(AnyValue::Null)))
        .collect())
}

/// Two-column frame `(key_name, value_name)` taken from a dimension, one row
/// per key.
fn reference_frame(
    dim: &DataFrame,
    key: &str,
    value: &str,
    key_name: &str,
    value_name: &str,
) -> Result<Option<DataFrame>> {
    if !has_column(dim, key) || !has_column(dim, value) {
        return Ok(None);
    }
    let keys = dim.column(key)?.clone().with_name(key_name.into());
    let values = dim.column(value)?.clone().with_name(value_name.into());
    let df = DataFrame::new(vec![keys, values])?;
    Ok(Some(distinct_on(&df, key_name)?))
}

fn drop_if_present(df: DataFrame, name: &str) -> Result<DataFrame> {
    if has_column(&df, name) {
        Ok(df.drop(name)?)
    } else {
        Ok(df)
    }
}

/// Replace a business-key column with the dimension's surrogate key.
fn resolve_foreign_key(df: DataFrame, fk: &ForeignKey, dims: &TableSet) -> Result<DataFrame> {
    let mut df = drop_if_present(df, fk.output)?;
    if has_column(&df, fk.column) {
        let dimension = fk.dimension;
        let reference = match dims.get(dimension.name) {
            Some(dim) => reference_frame(
                dim,
                &dimension.business_key(),
                &dimension.surrogate_key(),
                fk.column,
                fk.output,
            )?,
            None => None,
        };
        match reference {
            Some(reference) => df = safe_join(&df, Some(&reference), &[fk.column])?,
            None => debug!(
                column = fk.column,
                dimension = dimension.name,
                "dimension not supplied, foreign key left null"
            ),
        }
        df = df.drop(fk.column)?;
    }
    ensure_column(&mut df, fk.output, ColumnKind::Integer)?;
    Ok(df)
}

/// Resolve a date column to `date_sk` by exact calendar-day match.
fn resolve_date(df: DataFrame, date: &DateRef, dim_date: Option<&DataFrame>) -> Result<DataFrame> {
    let mut df = drop_if_present(df, date.output)?;
    let days: Option<Vec<Option<i64>>> = df.column(date.column.name).ok().map(|column| {
        (0..column.len())
            .map(|idx| any_to_date(column.get(idx).unwrap_or(AnyValue::Null)).map(date_sk))
            .collect()
    });
    if let Some(days) = days {
        df.with_column(Series::new(CALENDAR_DAY.into(), days))?;
        let reference = match dim_date {
            Some(dim) => reference_frame(dim, "date_sk", "date_sk", CALENDAR_DAY, date.output)?,
            None => None,
        };
        if let Some(reference) = reference {
            df = safe_join(&df, Some(&reference), &[CALENDAR_DAY])?;
        }
        df = df.drop(CALENDAR_DAY)?;
    }
    ensure_column(&mut df, date.output, ColumnKind::Integer)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use dw_model::catalog::{CUSTOMER, NPS_RESPONSE, PAYMENT, SALES_ORDER, SALES_ORDER_ITEM, WEB_SESSION};
    use dw_model::CalendarLocale;

    use super::*;
    use crate::calendar::calendar_frame;
    use crate::data_utils::column_value_string;
    use crate::dimension::build_dimension;

    fn strings(name: &str, values: &[Option<&str>]) -> Column {
        Series::new(name.into(), values.to_vec()).into()
    }

    fn floats(name: &str, values: &[Option<f64>]) -> Column {
        Series::new(name.into(), values.to_vec()).into()
    }

    fn f64_at(df: &DataFrame, name: &str, idx: usize) -> Option<f64> {
        df.column(name).unwrap().f64().unwrap().get(idx)
    }

    fn i64_at(df: &DataFrame, name: &str, idx: usize) -> Option<i64> {
        df.column(name).unwrap().i64().unwrap().get(idx)
    }

    fn item_raw(items: DataFrame) -> TableSet {
        TableSet::new().with_table("sales_order_item", items)
    }

    #[test]
    fn line_total_defaults_discount_before_deriving() {
        let items = DataFrame::new(vec![
            strings("order_item_id", &[Some("i1")]),
            strings("order_id", &[Some("o1")]),
            strings("product_id", &[Some("p1")]),
            floats("quantity", &[Some(3.0)]),
            floats("unit_price", &[Some(10.0)]),
            floats("discount_amount", &[None]),
        ])
        .unwrap();
        let df = build_fact(&item_raw(items), &SALES_ORDER_ITEM, &TableSet::new())
            .unwrap()
            .unwrap();
        assert_eq!(f64_at(&df, "discount_amount", 0), Some(0.0));
        assert_eq!(f64_at(&df, "line_total", 0), Some(30.0));
    }

    #[test]
    fn supplied_derived_values_are_kept() {
        let items = DataFrame::new(vec![
            strings("order_item_id", &[Some("i1"), Some("i2")]),
            strings("order_id", &[Some("o1"), Some("o1")]),
            strings("product_id", &[Some("p1"), Some("p2")]),
            strings("quantity", &[Some("2"), Some("x")]),
            floats("unit_price", &[Some(5.0), Some(5.0)]),
            floats("line_total", &[Some(99.0), None]),
        ])
        .unwrap();
        let df = build_fact(&item_raw(items), &SALES_ORDER_ITEM, &TableSet::new())
            .unwrap()
            .unwrap();
        assert_eq!(f64_at(&df, "line_total", 0), Some(99.0));
        // Unparseable quantity becomes null instead of failing the row.
        assert_eq!(f64_at(&df, "quantity", 1), None);
        assert_eq!(f64_at(&df, "line_total", 1), None);
    }

    #[test]
    fn rows_without_identifiers_are_dropped() {
        let items = DataFrame::new(vec![
            strings("order_item_id", &[Some("i1"), None, Some("i3")]),
            strings("order_id", &[Some("o1"), Some("o1"), None]),
            strings("product_id", &[Some("p1"), Some("p1"), Some("p1")]),
        ])
        .unwrap();
        let df = build_fact(&item_raw(items), &SALES_ORDER_ITEM, &TableSet::new())
            .unwrap()
            .unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn all_rows_dropped_is_an_empty_result() {
        let items = DataFrame::new(vec![
            strings("order_item_id", &[None]),
            strings("order_id", &[Some("o1")]),
            strings("product_id", &[Some("p1")]),
        ])
        .unwrap();
        assert!(matches!(
            build_fact(&item_raw(items), &SALES_ORDER_ITEM, &TableSet::new()),
            Err(TransformError::EmptyResult { .. })
        ));
    }

    #[test]
    fn required_columns_are_enforced() {
        let orders = DataFrame::new(vec![
            strings("order_id", &[Some("o1")]),
            strings("order_date", &[Some("2024-01-01")]),
        ])
        .unwrap();
        let raw = TableSet::new().with_table("sales_order", orders);
        assert!(matches!(
            build_fact(&raw, &SALES_ORDER, &TableSet::new()),
            Err(TransformError::MissingRequiredColumn { column, .. }) if column == "customer_id"
        ));
        assert!(matches!(
            build_fact(&TableSet::new(), &SALES_ORDER, &TableSet::new()),
            Err(TransformError::MissingSourceTable { .. })
        ));
        assert!(build_fact(&TableSet::new(), &PAYMENT, &TableSet::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn foreign_keys_and_dates_resolve_to_surrogates() {
        let raw = TableSet::new()
            .with_table(
                "customer",
                DataFrame::new(vec![strings("customer_id", &[Some("c9"), Some("c1")])]).unwrap(),
            )
            .with_table(
                "sales_order",
                DataFrame::new(vec![
                    strings("order_id", &[Some("o1"), Some("o2")]),
                    strings("customer_id", &[Some("c1"), Some("ghost")]),
                    strings("order_date", &[Some("2024-01-02 09:00:00"), Some("bad")]),
                    floats("subtotal", &[Some(100.0), None]),
                    floats("tax_amount", &[Some(21.0), None]),
                ])
                .unwrap(),
            );
        let mut dims = TableSet::new();
        dims.insert(
            "dim_customer",
            build_dimension(&raw, &CUSTOMER).unwrap().unwrap(),
        );
        dims.insert(
            DIM_DATE,
            calendar_frame(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                CalendarLocale::English,
            )
            .unwrap(),
        );

        let df = build_fact(&raw, &SALES_ORDER, &dims).unwrap().unwrap();
        assert_eq!(i64_at(&df, "customer_sk", 0), Some(2));
        assert_eq!(i64_at(&df, "customer_sk", 1), None);
        assert_eq!(i64_at(&df, "order_date_sk", 0), Some(20240102));
        assert_eq!(i64_at(&df, "order_date_sk", 1), None);
        assert_eq!(f64_at(&df, "total_amount", 0), Some(121.0));
        assert_eq!(f64_at(&df, "total_amount", 1), None);
        assert!(!has_column(&df, "customer_id"));
        assert!(!has_column(&df, "order_date"));
        // Unsupplied dimensions still produce the key columns.
        assert_eq!(df.column("store_sk").unwrap().null_count(), 2);
    }

    #[test]
    fn conflicting_duplicate_events_keep_the_first_row() {
        let orders = DataFrame::new(vec![
            strings("order_id", &[Some("o1"), Some("o2"), Some("o1"), Some("o2")]),
            strings("customer_id", &[Some("c1"), Some("c2"), Some("c3"), Some("c2")]),
            strings("order_date", &[Some("2024-01-01"); 4]),
            floats("subtotal", &[Some(10.0), Some(20.0), Some(99.0), Some(20.0)]),
        ])
        .unwrap();
        let raw = TableSet::new().with_table("sales_order", orders);
        let df = build_fact(&raw, &SALES_ORDER, &TableSet::new()).unwrap().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(column_value_string(&df, "order_id", 0), "o1");
        assert_eq!(f64_at(&df, "subtotal", 0), Some(10.0));
        assert_eq!(column_value_string(&df, "order_id", 1), "o2");
        assert_eq!(f64_at(&df, "subtotal", 1), Some(20.0));
    }

    #[test]
    fn leading_zero_and_alphanumeric_keys_join_verbatim() {
        let raw = TableSet::new()
            .with_table(
                "customer",
                DataFrame::new(vec![strings(
                    "customer_id",
                    &[Some("007"), Some("7"), Some("C-7a")],
                )])
                .unwrap(),
            )
            .with_table(
                "sales_order",
                DataFrame::new(vec![
                    strings("order_id", &[Some("0010"), Some("10"), Some("A-10")]),
                    strings("customer_id", &[Some("7"), Some("007"), Some("C-7a")]),
                    strings("order_date", &[Some("2024-01-01"); 3]),
                ])
                .unwrap(),
            );
        let dims = TableSet::new().with_table(
            "dim_customer",
            build_dimension(&raw, &CUSTOMER).unwrap().unwrap(),
        );

        let df = build_fact(&raw, &SALES_ORDER, &dims).unwrap().unwrap();
        assert_eq!(df.height(), 3);
        let ids: Vec<String> = (0..3).map(|idx| column_value_string(&df, "order_id", idx)).collect();
        assert_eq!(ids, vec!["0010", "10", "A-10"]);
        assert_eq!(i64_at(&df, "customer_sk", 0), Some(2));
        assert_eq!(i64_at(&df, "customer_sk", 1), Some(1));
        assert_eq!(i64_at(&df, "customer_sk", 2), Some(3));
    }

    #[test]
    fn session_duration_and_aliases() {
        let raw = TableSet::new()
            .with_table(
                "web_session",
                DataFrame::new(vec![
                    strings("session_id", &[Some("w1")]),
                    strings("started_at", &[Some("2024-01-01T10:00:00")]),
                    strings("ended_at", &[Some("2024-01-01T10:45:30")]),
                ])
                .unwrap(),
            )
            .with_table(
                "nps_response",
                DataFrame::new(vec![
                    strings("nps_id", &[Some("n1")]),
                    strings("responded_at", &[Some("2024-01-01")]),
                    strings("score", &[Some("9")]),
                ])
                .unwrap(),
            );
        let calendar = calendar_frame(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            CalendarLocale::English,
        )
        .unwrap();
        let dims = TableSet::new().with_table(DIM_DATE, calendar);

        let sessions = build_fact(&raw, &WEB_SESSION, &dims).unwrap().unwrap();
        assert_eq!(f64_at(&sessions, "duration_minutes", 0), Some(45.5));
        assert_eq!(i64_at(&sessions, "start_date_sk", 0), Some(20240101));

        let nps = build_fact(&raw, &NPS_RESPONSE, &dims).unwrap().unwrap();
        assert_eq!(column_value_string(&nps, "response_id", 0), "n1");
        assert_eq!(i64_at(&nps, "response_date_sk", 0), Some(20240101));
        assert_eq!(f64_at(&nps, "score", 0), Some(9.0));
        assert_eq!(nps.column("customer_sk").unwrap().null_count(), 1);
    }
}
