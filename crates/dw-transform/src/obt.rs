//! One-big-table assembler.
//!
//! Starts from the order-line fact, joins the order header, then executes the
//! declarative [`OBT_JOIN_PLAN`]. Role-playing dimensions (address, province)
//! are joined once per role with role-prefixed output columns. Optional
//! enrichments that cannot be applied leave their columns null; the final
//! projection always has the full [`OBT_COLUMNS`] schema.

use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;
use dw_common::{any_to_f64, any_to_key};
use dw_model::catalog::{
    NPS_RESPONSE, OBT_COLUMNS, OBT_JOIN_PLAN, ONE_BIG_TABLE, PAYMENT, SALES_ORDER,
    SALES_ORDER_ITEM,
};
use dw_model::{JoinStep, PipelineConfig, RawProvider, TableSet};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::calendar::calendar_columns;
use crate::data_utils::{column_keys, column_value_string, distinct_on, has_column, null_column};
use crate::datetime::any_to_date;
use crate::error::{Result, TransformError};
use crate::join::safe_join;

/// Calendar attributes carried on the OBT, as produced by the calendar
/// derivation. `date_sk` lands in `order_date_sk`.
const CALENDAR_ATTRIBUTES: &[(&str, &str)] = &[
    ("date_sk", "order_date_sk"),
    ("date", "date"),
    ("year", "year"),
    ("quarter", "quarter"),
    ("month", "month"),
    ("month_name", "month_name"),
    ("day", "day"),
    ("day_name", "day_name"),
    ("week_number", "week_number"),
    ("year_month", "year_month"),
    ("is_weekend", "is_weekend"),
];

/// Assemble the one-big-table at order-line grain.
pub fn build_obt<P>(
    raw: &P,
    dims: &TableSet,
    facts: &TableSet,
    config: &PipelineConfig,
) -> Result<DataFrame>
where
    P: RawProvider + ?Sized,
{
    let start = Instant::now();
    let items = base_fact(facts, SALES_ORDER_ITEM.name)?;
    let orders = base_fact(facts, SALES_ORDER.name)?;

    let mut df = safe_join(items, Some(&distinct_on(orders, "order_id")?), &["order_id"])?;
    for step in OBT_JOIN_PLAN {
        df = apply_step(df, step, dims)?;
    }

    df = apply_date_fallback(df, raw, config)?;
    df = attach_payment_amount(df, facts.get(PAYMENT.name))?;
    df = attach_nps_score(df, facts.get(NPS_RESPONSE.name))?;
    apply_valid_sale(&mut df, config)?;

    let df = project(&df)?;
    info!(
        table = ONE_BIG_TABLE,
        rows = df.height(),
        columns = df.width(),
        duration_ms = start.elapsed().as_millis(),
        "built one-big-table"
    );
    Ok(df)
}

fn base_fact<'a>(facts: &'a TableSet, name: &str) -> Result<&'a DataFrame> {
    facts
        .get(name)
        .filter(|df| df.height() > 0)
        .ok_or_else(|| TransformError::EmptyBaseFact {
            table: name.to_string(),
        })
}

/// Execute one step of the join plan, or skip it with a warning when the
/// dimension or the left key is unavailable.
fn apply_step(df: DataFrame, step: &JoinStep, dims: &TableSet) -> Result<DataFrame> {
    let Some(dim) = dims.get(step.dimension) else {
        warn!(
            dimension = step.dimension,
            role = step.role.unwrap_or("-"),
            "dimension unavailable, columns will be null"
        );
        return Ok(df);
    };
    if !has_column(&df, step.left_key) || !has_column(dim, step.right_key) {
        warn!(
            dimension = step.dimension,
            left_key = step.left_key,
            right_key = step.right_key,
            "join key unavailable, columns will be null"
        );
        return Ok(df);
    }

    let mut right = vec![dim.column(step.right_key)?.clone().with_name(step.left_key.into())];
    let mut df = df;
    for (source, target) in step.columns {
        let output = step.output_name(target);
        if !has_column(dim, source) || output == step.left_key {
            continue;
        }
        if has_column(&df, &output) {
            df = df.drop(&output)?;
        }
        right.push(dim.column(source)?.clone().with_name(output.as_str().into()));
    }
    let right = distinct_on(&DataFrame::new(right)?, step.left_key)?;
    debug!(
        dimension = step.dimension,
        role = step.role.unwrap_or("-"),
        key = step.left_key,
        "applying join step"
    );
    safe_join(&df, Some(&right), &[step.left_key])
}

/// Re-derive calendar attributes for rows the date join left without a date,
/// using the raw order date of their order.
fn apply_date_fallback<P>(df: DataFrame, raw: &P, config: &PipelineConfig) -> Result<DataFrame>
where
    P: RawProvider + ?Sized,
{
    let height = df.height();
    let mut dates: Vec<Option<NaiveDate>> = match df.column("date") {
        Ok(column) => (0..height)
            .map(|idx| any_to_date(column.get(idx).unwrap_or(AnyValue::Null)))
            .collect(),
        Err(_) => vec![None; height],
    };
    let missing = dates.iter().filter(|date| date.is_none()).count();
    if missing == 0 {
        return Ok(df);
    }

    let raw_dates = raw_order_dates(raw);
    let order_keys = column_keys(&df, "order_id").unwrap_or_else(|| vec![None; height]);
    let mut recovered = 0usize;
    for (date, key) in dates.iter_mut().zip(&order_keys) {
        if date.is_none()
            && let Some(found) = key.as_ref().and_then(|key| raw_dates.get(key))
        {
            *date = Some(*found);
            recovered += 1;
        }
    }
    warn!(
        rows = missing,
        recovered, "order dates unresolved against the calendar, deriving from raw values"
    );

    let mut df = df;
    let columns = calendar_columns(&dates, config.calendar.locale)?;
    for column in columns {
        let Some((_, output)) = CALENDAR_ATTRIBUTES
            .iter()
            .find(|(source, _)| *source == column.name().as_str())
        else {
            continue;
        };
        df.with_column(column.with_name((*output).into()))?;
    }
    Ok(df)
}

fn raw_order_dates<P>(raw: &P) -> HashMap<String, NaiveDate>
where
    P: RawProvider + ?Sized,
{
    let mut dates = HashMap::new();
    let Some(orders) = raw.get(SALES_ORDER.source) else {
        return dates;
    };
    let (Ok(ids), Ok(values)) = (orders.column("order_id"), orders.column("order_date")) else {
        return dates;
    };
    for idx in 0..orders.height() {
        let key = any_to_key(ids.get(idx).unwrap_or(AnyValue::Null));
        let date = any_to_date(values.get(idx).unwrap_or(AnyValue::Null));
        if let (Some(key), Some(date)) = (key, date) {
            dates.entry(key).or_insert(date);
        }
    }
    dates
}

/// How a group of measure values collapses into one.
#[derive(Debug, Clone, Copy)]
enum Reduce {
    Sum,
    Mean,
}

impl Reduce {
    fn expr(self, value: &str) -> Expr {
        let value = measure(value);
        match self {
            Self::Sum => value.sum(),
            Self::Mean => value.mean(),
        }
    }
}

fn measure(value: &str) -> Expr {
    col(value).cast(DataType::Float64)
}

/// Group `value` by `key` and reduce each group. Rows without a key or value
/// are ignored; groups keep first-seen order.
fn aggregate(
    df: &DataFrame,
    key: &str,
    value: &str,
    output: &str,
    reduce: Reduce,
) -> Result<Option<DataFrame>> {
    if !has_column(df, key) || !has_column(df, value) {
        return Ok(None);
    }
    let grouped = df
        .clone()
        .lazy()
        .filter(col(key).is_not_null().and(measure(value).is_not_null()))
        .group_by_stable([col(key)])
        .agg([reduce.expr(value).alias(output)])
        .collect()?;
    Ok(Some(grouped))
}

fn attach_aggregate(
    df: DataFrame,
    fact: Option<&DataFrame>,
    key: &str,
    value: &str,
    output: &str,
    reduce: Reduce,
) -> Result<DataFrame> {
    let Some(fact) = fact else {
        debug!(output, "source fact absent, column will be null");
        return Ok(df);
    };
    let Some(right) = aggregate(fact, key, value, output, reduce)? else {
        return Ok(df);
    };
    let df = if has_column(&df, output) {
        df.drop(output)?
    } else {
        df
    };
    safe_join(&df, Some(&right), &[key])
}

/// Total payment amount per order.
fn attach_payment_amount(df: DataFrame, payments: Option<&DataFrame>) -> Result<DataFrame> {
    attach_aggregate(df, payments, "order_id", "amount", "payment_amount", Reduce::Sum)
}

/// Mean NPS score per customer.
fn attach_nps_score(df: DataFrame, responses: Option<&DataFrame>) -> Result<DataFrame> {
    attach_aggregate(df, responses, "customer_sk", "score", "nps_score", Reduce::Mean)
}

/// `is_valid_sale` from the order status, and `sales_amount` gated on it.
fn apply_valid_sale(df: &mut DataFrame, config: &PipelineConfig) -> Result<()> {
    let height = df.height();
    let valid: Vec<bool> = (0..height)
        .map(|idx| config.is_accepted_status(&column_value_string(df, "status", idx)))
        .collect();
    let line_totals: Vec<Option<f64>> = match df.column("line_total") {
        Ok(column) => (0..height)
            .map(|idx| any_to_f64(column.get(idx).unwrap_or(AnyValue::Null)))
            .collect(),
        Err(_) => vec![None; height],
    };
    let sales: Vec<Option<f64>> = valid
        .iter()
        .zip(line_totals)
        .map(|(valid, total)| if *valid { total } else { Some(0.0) })
        .collect();
    df.with_column(Series::new("is_valid_sale".into(), valid))?;
    df.with_column(Series::new("sales_amount".into(), sales))?;
    Ok(())
}

/// Fixed, typed projection; absent columns become all-null.
fn project(df: &DataFrame) -> Result<DataFrame> {
    let height = df.height();
    let mut columns = Vec::with_capacity(OBT_COLUMNS.len());
    for spec in OBT_COLUMNS {
        let column = match df.column(spec.name) {
            Ok(column) => column.cast(&spec.kind.dtype())?,
            Err(_) => {
                debug!(column = spec.name, "column absent, filling with nulls");
                null_column(spec.name, height, spec.kind)
            }
        };
        columns.push(column);
    }
    Ok(DataFrame::new(columns)?)
}
