//! Calendar (date) dimension.
//!
//! The dimension spans the inclusive day range covered by every configured
//! date-bearing raw column and by every date column a fact resolves against
//! it. The same per-day derivation is reused by the
//! one-big-table when a row's date has to be recomputed from raw values.

use std::time::Instant;

use chrono::{Datelike, NaiveDate, Weekday};
use dw_model::catalog::{DIM_DATE, FACTS};
use dw_model::{CalendarConfig, CalendarLocale, RawProvider};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::datetime::{any_to_date, date_to_epoch_days};
use crate::error::Result;

/// Calendar attributes of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
}

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// `YYYYMMDD` as an integer.
    pub fn date_sk(&self) -> i64 {
        date_sk(self.date)
    }

    pub fn quarter(&self) -> i64 {
        i64::from((self.date.month() - 1) / 3 + 1)
    }

    /// ISO 8601 week number.
    pub fn week_number(&self) -> i64 {
        i64::from(self.date.iso_week().week())
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn year_month(&self) -> String {
        format!("{:04}-{:02}", self.date.year(), self.date.month())
    }

    pub fn month_date(&self) -> NaiveDate {
        self.date.with_day(1).unwrap_or(self.date)
    }

    pub fn day_name(&self, locale: CalendarLocale) -> &'static str {
        locale.day_name(self.date.weekday().num_days_from_monday())
    }

    pub fn month_name(&self, locale: CalendarLocale) -> &'static str {
        locale.month_name(self.date.month())
    }
}

/// `YYYYMMDD` encoding of a date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use dw_transform::calendar::date_sk;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
/// assert_eq!(date_sk(date), 20240103);
/// ```
pub fn date_sk(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// `(table, column)` pairs scanned for the calendar range: the configured
/// sources, then each fact date reference resolved to the first of its
/// names present in the raw table (the column the fact itself will read).
pub fn date_sources<P>(raw: &P, calendar: &CalendarConfig) -> Vec<(String, String)>
where
    P: RawProvider + ?Sized,
{
    let mut sources: Vec<(String, String)> = calendar
        .sources
        .iter()
        .map(|source| (source.table.clone(), source.column.clone()))
        .collect();
    for spec in FACTS {
        let Some(table) = raw.get(spec.source) else {
            continue;
        };
        for date in spec.dates {
            let Some(found) = date
                .column
                .candidates()
                .find(|name| table.column(name).is_ok())
            else {
                continue;
            };
            let pair = (spec.source.to_string(), found.to_string());
            if !sources.contains(&pair) {
                sources.push(pair);
            }
        }
    }
    sources
}

/// Inclusive `[min, max]` day range over every [`date_sources`] column that
/// is present. Absent tables and columns are skipped.
pub fn observed_date_range<P>(raw: &P, calendar: &CalendarConfig) -> Option<(NaiveDate, NaiveDate)>
where
    P: RawProvider + ?Sized,
{
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for (table_name, column_name) in date_sources(raw, calendar) {
        let Some(table) = raw.get(&table_name) else {
            continue;
        };
        let Ok(column) = table.column(&column_name) else {
            continue;
        };
        let mut parsed = 0usize;
        for idx in 0..table.height() {
            let Some(date) = any_to_date(column.get(idx).unwrap_or(AnyValue::Null)) else {
                continue;
            };
            parsed += 1;
            range = Some(match range {
                Some((min, max)) => (min.min(date), max.max(date)),
                None => (date, date),
            });
        }
        debug!(
            table = %table_name,
            column = %column_name,
            parsed,
            rows = table.height(),
            "scanned date source"
        );
    }
    range
}

/// Build the calendar dimension from the raw extract.
///
/// Falls back to the configured window when no source yields a valid date,
/// so the dimension is never empty.
pub fn build_date_dimension<P>(raw: &P, calendar: &CalendarConfig) -> Result<DataFrame>
where
    P: RawProvider + ?Sized,
{
    let start = Instant::now();
    let (first, last) = match observed_date_range(raw, calendar) {
        Some(range) => range,
        None => {
            let fallback = calendar.fallback_range();
            warn!(
                fallback_start = %fallback.0,
                fallback_end = %fallback.1,
                "no valid dates in raw sources, using fallback calendar window"
            );
            fallback
        }
    };
    let df = calendar_frame(first, last, calendar.locale)?;
    info!(
        table = DIM_DATE,
        rows = df.height(),
        first = %first,
        last = %last,
        duration_ms = start.elapsed().as_millis(),
        "built dimension"
    );
    Ok(df)
}

/// One row per day in `[first, last]`, ascending.
pub fn calendar_frame(first: NaiveDate, last: NaiveDate, locale: CalendarLocale) -> Result<DataFrame> {
    let days: Vec<Option<NaiveDate>> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(Some)
        .collect();
    Ok(DataFrame::new(calendar_columns(&days, locale)?)?)
}

/// Calendar attribute columns for a sequence of optional dates, in dimension
/// column order. `None` dates produce null attributes.
pub fn calendar_columns(dates: &[Option<NaiveDate>], locale: CalendarLocale) -> Result<Vec<Column>> {
    let days: Vec<Option<CalendarDay>> = dates.iter().map(|d| d.map(CalendarDay::new)).collect();
    let int = |name: &str, f: fn(&CalendarDay) -> i64| -> Column {
        let values: Vec<Option<i64>> = days.iter().map(|d| d.as_ref().map(f)).collect();
        Series::new(name.into(), values).into_column()
    };
    let text = |name: &str, f: &dyn Fn(&CalendarDay) -> String| -> Column {
        let values: Vec<Option<String>> = days.iter().map(|d| d.as_ref().map(f)).collect();
        Series::new(name.into(), values).into_column()
    };

    let date_values: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_epoch_days)).collect();
    let month_values: Vec<Option<i32>> = days
        .iter()
        .map(|d| d.map(|day| date_to_epoch_days(day.month_date())))
        .collect();
    let weekend: Vec<Option<bool>> = days.iter().map(|d| d.map(|day| day.is_weekend())).collect();

    Ok(vec![
        int("date_sk", CalendarDay::date_sk),
        date_column("date", date_values)?,
        int("day", |d| i64::from(d.date.day())),
        int("month", |d| i64::from(d.date.month())),
        int("year", |d| i64::from(d.date.year())),
        int("quarter", CalendarDay::quarter),
        int("week_number", CalendarDay::week_number),
        text("day_name", &|d| d.day_name(locale).to_string()),
        text("month_name", &|d| d.month_name(locale).to_string()),
        Series::new("is_weekend".into(), weekend).into_column(),
        text("year_month", &CalendarDay::year_month),
        date_column("month_date", month_values)?,
    ])
}

fn date_column(name: &str, epoch_days: Vec<Option<i32>>) -> Result<Column> {
    Ok(Series::new(name.into(), epoch_days)
        .cast(&DataType::Date)?
        .into_column())
}
