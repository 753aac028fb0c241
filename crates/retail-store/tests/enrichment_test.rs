//! Integration tests for the enrichment backfill and reports over DuckDB

use retail_core::{Measure, ReportKind, Transaction};
use retail_store::{DuckDbStore, SalesStore, TableRef};
use rust_decimal::Decimal;
use std::path::Path;
use tempfile::TempDir;

/// Create and fill the sales table the way an external loader would.
fn seed_database(db_path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(db_path)?;

    conn.execute_batch(
        r#"
        CREATE TABLE main.sales (
            invoice_id VARCHAR NOT NULL,
            branch VARCHAR NOT NULL,
            city VARCHAR NOT NULL,
            customer_type VARCHAR NOT NULL,
            gender VARCHAR NOT NULL,
            product_line VARCHAR NOT NULL,
            unit_price DECIMAL(10,2) NOT NULL,
            quantity INTEGER NOT NULL,
            tax_rate DECIMAL(12,4) NOT NULL,
            total DECIMAL(12,4) NOT NULL,
            cogs DECIMAL(12,2) NOT NULL,
            gross_margin_pct DECIMAL(11,9) NOT NULL,
            gross_income DECIMAL(12,4) NOT NULL,
            rating DECIMAL(3,1),
            transaction_date DATE,
            transaction_time TIME,
            payment_method VARCHAR NOT NULL
        );

        INSERT INTO main.sales VALUES
            ('750-67-8428', 'A', 'Yangon', 'Member', 'Female', 'Health and beauty', 74.69, 7, 26.1415, 548.9715, 522.83, 4.761904762, 26.1415, 9.1, '2019-01-05', '13:08:00', 'Ewallet'),
            ('226-31-3081', 'C', 'Naypyitaw', 'Normal', 'Female', 'Electronic accessories', 15.28, 5, 3.8200, 80.2200, 76.40, 4.761904762, 3.8200, 9.6, '2019-03-08', '10:29:00', 'Cash'),
            ('631-41-3108', 'A', 'Yangon', 'Normal', 'Male', 'Home and lifestyle', 46.33, 7, 16.2155, 340.5255, 324.31, 4.761904762, 16.2155, 7.4, '2019-03-03', '13:23:00', 'Credit card'),
            ('123-19-1176', 'B', 'Mandalay', 'Member', 'Male', 'Health and beauty', 58.22, 8, 23.2880, 489.0480, 465.76, 4.761904762, 23.2880, 8.4, '2019-01-27', '20:33:00', 'Ewallet'),
            ('373-73-7910', 'A', 'Yangon', 'Normal', 'Male', 'Sports and travel', 86.31, 7, 30.2085, 634.3785, 604.17, 4.761904762, 30.2085, 5.3, '2019-02-08', '10:37:00', 'Ewallet'),
            ('699-14-3026', 'C', 'Naypyitaw', 'Normal', 'Male', 'Electronic accessories', 85.39, 7, 29.8865, 627.6165, 597.73, 4.761904762, 29.8865, 4.1, '2019-03-25', '18:30:00', 'Ewallet'),
            ('355-53-5943', 'A', 'Yangon', 'Member', 'Female', 'Electronic accessories', 68.84, 6, 20.6520, 433.6920, 413.04, 4.761904762, 20.6520, 5.8, '2019-02-25', '14:36:00', 'Ewallet'),
            ('315-22-5665', 'C', 'Naypyitaw', 'Normal', 'Female', 'Home and lifestyle', 73.56, 10, 36.7800, 772.3800, 735.60, 4.761904762, 36.7800, NULL, '2019-02-24', '11:38:00', 'Ewallet');
        "#,
    )?;

    Ok(())
}

fn derived_columns(store: &DuckDbStore) -> anyhow::Result<Vec<(String, Option<String>, Option<String>, Option<String>)>> {
    let mut stmt = store.connection().prepare(
        "SELECT invoice_id, time_period, day_of_week, month_name FROM main.sales ORDER BY invoice_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn test_enrich_backfills_derived_columns() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    let mut store = DuckDbStore::open(&db_path, TableRef::default())?;
    assert_eq!(store.schema_version()?, 2, "open should add the derived columns");

    let summary = store.enrich()?;
    assert_eq!(summary.rows_enriched, 8);

    let rows = derived_columns(&store)?;
    let first = rows
        .iter()
        .find(|(id, ..)| id == "750-67-8428")
        .expect("seeded row");
    assert_eq!(first.1.as_deref(), Some("Afternoon"));
    assert_eq!(first.2.as_deref(), Some("Saturday"));
    assert_eq!(first.3.as_deref(), Some("January"));

    let evening = rows
        .iter()
        .find(|(id, ..)| id == "699-14-3026")
        .expect("seeded row");
    assert_eq!(evening.1.as_deref(), Some("Evening"));
    assert_eq!(evening.2.as_deref(), Some("Monday"));
    assert_eq!(evening.3.as_deref(), Some("March"));

    Ok(())
}

#[test]
fn test_enrich_is_idempotent() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    let mut store = DuckDbStore::open(&db_path, TableRef::default())?;
    store.enrich()?;
    let first = derived_columns(&store)?;
    drop(store);

    // reopening must not re-run migrations or duplicate columns
    let mut store = DuckDbStore::open(&db_path, TableRef::default())?;
    store.enrich()?;
    let second = derived_columns(&store)?;

    assert_eq!(first, second);

    let column_count: i64 = store.connection().query_row(
        "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = 'main' AND table_name = 'sales'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(column_count, 20);

    Ok(())
}

#[test]
fn test_enrich_rejects_missing_time() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    let mut store = DuckDbStore::open(&db_path, TableRef::default())?;
    store
        .connection()
        .execute_batch("UPDATE main.sales SET transaction_time = NULL WHERE invoice_id = '373-73-7910'")?;

    let err = store.enrich().unwrap_err();
    assert!(err.is_data(), "expected data error, got {}", err);
    assert!(err.to_string().contains("373-73-7910"));

    // nothing was written
    let rows = derived_columns(&store)?;
    assert!(rows.iter().all(|(_, period, day, month)| {
        period.is_none() && day.is_none() && month.is_none()
    }));

    Ok(())
}

#[test]
fn test_incompatible_derived_column_fails_on_open() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    {
        let conn = duckdb::Connection::open(&db_path)?;
        conn.execute_batch("ALTER TABLE main.sales ADD COLUMN day_of_week INTEGER")?;
    }

    let err = DuckDbStore::open(&db_path, TableRef::default())
        .err()
        .expect("open should fail");
    assert!(err.is_schema(), "expected schema error, got {}", err);

    Ok(())
}

#[test]
fn test_reports_over_enriched_table() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    let mut store = DuckDbStore::open(&db_path, TableRef::default())?;
    store.enrich()?;

    let results = store.run_reports(&ReportKind::ALL)?;
    assert_eq!(results.len(), ReportKind::ALL.len());
    assert!(results.iter().all(|r| r.source_rows == 8));

    let unique = store.run_report(ReportKind::UniqueCities)?;
    assert_eq!(unique.report.rows[0].value, Some(Measure::Count(3)));

    let cities = store.run_report(ReportKind::CityRevenue)?.report;
    let order: Vec<_> = cities.rows.iter().map(|r| r.keys[0].as_str()).collect();
    assert_eq!(order, vec!["Yangon", "Naypyitaw", "Mandalay"]);
    assert_eq!(
        cities.value_of(&["Yangon"]),
        Some(Measure::Amount(d("1957.5675")))
    );

    let categories = store.run_report(ReportKind::CategoryRevenue)?.report;
    let partitioned: Decimal = categories
        .rows
        .iter()
        .filter_map(|r| r.value.map(|v| v.as_decimal()))
        .sum();
    assert_eq!(partitioned, d("3926.832"));

    let periods = store.run_report(ReportKind::AvgRatingByPeriod)?.report;
    let rendered: Vec<_> = periods
        .rows
        .iter()
        .map(|r| format!("{}={}", r.keys[0], r.value.unwrap()))
        .collect();
    assert_eq!(
        rendered,
        vec!["Morning=7.45", "Afternoon=7.43", "Evening=6.25"]
    );

    let histogram = store.run_report(ReportKind::RatingHistogram)?.report;
    assert_eq!(histogram.value_of(&["Unknown"]), Some(Measure::Count(1)));
    assert_eq!(histogram.value_of(&["8-10"]), Some(Measure::Count(3)));

    Ok(())
}

#[test]
fn test_derived_reports_require_enrichment() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;

    let store = DuckDbStore::open(&db_path, TableRef::default())?;

    let err = store.run_report(ReportKind::MonthlyRevenue).unwrap_err();
    assert!(err.is_data());

    let branches = store.run_report(ReportKind::BranchRevenue)?.report;
    assert_eq!(branches.len(), 3);

    Ok(())
}

#[test]
fn test_insert_rejects_duplicates_within_batch() -> anyhow::Result<()> {
    let mut store = DuckDbStore::open_in_memory(TableRef::default())?;
    store.create_table()?;

    let sale = Transaction {
        invoice_id: "101-00-0001".to_string(),
        ..Transaction::default()
    };
    let err = store
        .insert_transactions(&[sale.clone(), sale])
        .unwrap_err();
    assert!(err.is_data());
    assert_eq!(store.row_count()?, 0);

    Ok(())
}

#[test]
fn test_insert_then_load() -> anyhow::Result<()> {
    let mut store = DuckDbStore::open_in_memory(TableRef::default())?;
    store.create_table()?;

    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("sales.duckdb");
    seed_database(&db_path)?;
    let mut records = DuckDbStore::open(&db_path, TableRef::default())?.load_transactions()?;

    assert_eq!(store.insert_transactions(&records)?, 8);
    assert_eq!(store.row_count()?, 8);

    let loaded = store.load_transactions()?;
    records.sort_by(|a, b| a.invoice_id.cmp(&b.invoice_id));
    assert_eq!(loaded, records);

    // a second insert of an existing invoice is rejected and rolled back
    let err = store.insert_transactions(&records[..2]).unwrap_err();
    assert!(err.is_data(), "expected data error, got {}", err);
    assert!(err.to_string().contains(&records[0].invoice_id));
    assert_eq!(store.row_count()?, 8);
    assert_eq!(store.load_transactions()?.len(), 8);

    Ok(())
}
