//! Property tests for the calendar dimension.

use chrono::{Days, NaiveDate};
use dw_model::{CalendarConfig, TableSet};
use dw_transform::build_date_dimension;
use polars::prelude::*;
use proptest::prelude::*;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()
}

fn raw_with_dates(offsets: &[u64]) -> (TableSet, NaiveDate, NaiveDate) {
    let dates: Vec<NaiveDate> = offsets
        .iter()
        .map(|offset| base().checked_add_days(Days::new(*offset)).unwrap())
        .collect();
    let rendered: Vec<String> = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let column: Column = Series::new("order_date".into(), rendered).into();
    let raw = TableSet::new().with_table("sales_order", DataFrame::new(vec![column]).unwrap());
    let min = *dates.iter().min().unwrap();
    let max = *dates.iter().max().unwrap();
    (raw, min, max)
}

proptest! {
    #[test]
    fn calendar_is_contiguous_and_increasing(offsets in prop::collection::vec(0u64..2000, 1..20)) {
        let (raw, min, max) = raw_with_dates(&offsets);
        let df = build_date_dimension(&raw, &CalendarConfig::default()).unwrap();

        let expected_days = (max - min).num_days() as usize + 1;
        prop_assert_eq!(df.height(), expected_days);

        let sks: Vec<i64> = df.column("date_sk").unwrap().i64().unwrap().into_no_null_iter().collect();
        prop_assert!(sks.windows(2).all(|pair| pair[0] < pair[1]));

        let first = min.format("%Y%m%d").to_string().parse::<i64>().unwrap();
        let last = max.format("%Y%m%d").to_string().parse::<i64>().unwrap();
        prop_assert_eq!(sks.first().copied(), Some(first));
        prop_assert_eq!(sks.last().copied(), Some(last));

        let days: Vec<i32> = df
            .column("date")
            .unwrap()
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        prop_assert!(days.windows(2).all(|pair| pair[1] - pair[0] == 1));
    }

    #[test]
    fn row_order_does_not_change_the_calendar(mut offsets in prop::collection::vec(0u64..500, 2..10)) {
        let (raw, _, _) = raw_with_dates(&offsets);
        offsets.reverse();
        let (reversed, _, _) = raw_with_dates(&offsets);
        let config = CalendarConfig::default();
        let left = build_date_dimension(&raw, &config).unwrap();
        let right = build_date_dimension(&reversed, &config).unwrap();
        prop_assert!(left.equals_missing(&right));
    }
}

#[test]
fn three_day_round_trip() {
    let column: Column = Series::new("order_date".into(), vec!["2024-01-03", "2024-01-01"]).into();
    let raw = TableSet::new().with_table("sales_order", DataFrame::new(vec![column]).unwrap());
    let df = build_date_dimension(&raw, &CalendarConfig::default()).unwrap();
    let sks: Vec<i64> = df.column("date_sk").unwrap().i64().unwrap().into_no_null_iter().collect();
    assert_eq!(sks, vec![20240101, 20240102, 20240103]);
}
