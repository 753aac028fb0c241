//! Property-based tests for enrichment and the report catalog
//!
//! These tests generate arbitrary transaction sets and verify that:
//! 1. Enrichment always yields one of the three time periods and is idempotent
//! 2. Category revenue partitions total revenue exactly
//! 3. Distinct-city counts do not depend on row order

use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;
use retail_core::{enrich, Measure, ReportKind, TimePeriod, Transaction};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

// ===== Generators =====

fn arb_city() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Yangon"), Just("Mandalay"), Just("Naypyitaw"), Just("Bago")]
}

fn arb_product_line() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("Electronic accessories"),
        Just("Fashion accessories"),
        Just("Food and beverages"),
        Just("Health and beauty"),
        Just("Home and lifestyle"),
        Just("Sports and travel"),
    ]
}

/// Amounts with four decimal places, like the total column.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|n| Decimal::new(n, 4))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2018i32..2021, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_time() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60, 0u32..60).prop_map(|(h, m, s)| NaiveTime::from_hms_opt(h, m, s).unwrap())
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        arb_city(),
        arb_product_line(),
        arb_amount(),
        arb_date(),
        arb_time(),
        proptest::option::of((0i64..=100).prop_map(|n| Decimal::new(n, 1))),
    )
        .prop_map(|(city, product_line, total, date, time, rating)| Transaction {
            city: city.to_string(),
            product_line: product_line.to_string(),
            total,
            date: Some(date),
            time: Some(time),
            rating,
            ..Default::default()
        })
}

fn arb_transactions() -> impl Strategy<Value = Vec<Transaction>> {
    proptest::collection::vec(arb_transaction(), 0..60).prop_map(|mut records| {
        for (i, record) in records.iter_mut().enumerate() {
            record.invoice_id = format!("INV-{:05}", i);
        }
        records
    })
}

// ===== Properties =====

proptest! {
    #[test]
    fn prop_enrichment_is_idempotent(mut records in arb_transactions()) {
        enrich(&mut records).unwrap();

        for record in &records {
            let period = record.derived.unwrap().time_period;
            prop_assert!(TimePeriod::ALL.contains(&period));
        }

        let once = records.clone();
        enrich(&mut records).unwrap();
        prop_assert_eq!(once, records);
    }

    #[test]
    fn prop_category_revenue_partitions_total(records in arb_transactions()) {
        let report = ReportKind::CategoryRevenue.run(&records).unwrap();

        let partitioned: Decimal = report
            .rows
            .iter()
            .filter_map(|row| row.value.map(|v| v.as_decimal()))
            .sum();
        let total: Decimal = records.iter().map(|r| r.total).sum();

        prop_assert_eq!(partitioned, total);
    }

    #[test]
    fn prop_unique_cities_ignores_row_order(records in arb_transactions()) {
        let expected = records.iter().map(|r| r.city.as_str()).collect::<BTreeSet<_>>().len();

        let forward = ReportKind::UniqueCities.run(&records).unwrap();
        let mut reversed = records.clone();
        reversed.reverse();
        let backward = ReportKind::UniqueCities.run(&reversed).unwrap();

        prop_assert_eq!(forward.rows[0].value, Some(Measure::Count(expected as u64)));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn prop_rating_histogram_counts_every_row(records in arb_transactions()) {
        let report = ReportKind::RatingHistogram.run(&records).unwrap();

        let counted: u64 = report
            .rows
            .iter()
            .map(|row| match row.value {
                Some(Measure::Count(n)) => n,
                _ => 0,
            })
            .sum();

        prop_assert_eq!(counted, records.len() as u64);
    }

    #[test]
    fn prop_revenue_rows_sorted_descending(records in arb_transactions()) {
        let report = ReportKind::CityRevenue.run(&records).unwrap();

        for pair in report.rows.windows(2) {
            let (a, b) = (pair[0].value.unwrap(), pair[1].value.unwrap());
            prop_assert!(a.as_decimal() >= b.as_decimal());
            if a == b {
                prop_assert!(pair[0].keys < pair[1].keys);
            }
        }
    }
}
