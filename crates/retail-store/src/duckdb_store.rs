//! DuckDB store implementation.

use crate::error::StoreError;
use crate::schema;
use crate::types::TableRef;
use crate::SalesStore;
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use duckdb::{params, Connection};
use retail_core::derive::{parse_month, parse_weekday};
use retail_core::{DerivedAttributes, RetailError, TimePeriod, Transaction};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// DuckDB-backed sales table.
///
/// Opening the store runs the schema-version check once; every later
/// operation assumes the table is at [`schema::CURRENT_SCHEMA_VERSION`].
pub struct DuckDbStore {
    connection: Connection,
    table: TableRef,
}

impl DuckDbStore {
    /// Open or create a database file and bring an existing sales table up
    /// to the current schema version.
    pub fn open(database_path: &Path, table: TableRef) -> Result<Self, StoreError> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let connection = Connection::open(database_path)
            .map_err(|e| StoreError::connection_failed(format!("{:?}: {}", database_path, e)))?;

        Self::init(connection, table)
    }

    /// Open an in-memory database.
    pub fn open_in_memory(table: TableRef) -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()
            .map_err(|e| StoreError::connection_failed(e.to_string()))?;

        Self::init(connection, table)
    }

    fn init(mut connection: Connection, table: TableRef) -> Result<Self, StoreError> {
        connection
            .execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", table.schema))
            .map_err(|e| StoreError::query_failed("schema", e))?;

        if schema::table_exists(&connection, &table)? {
            schema::migrate(&mut connection, &table)?;
        } else {
            debug!(table = %table, "sales table not present yet");
        }

        Ok(Self { connection, table })
    }

    /// Create the sales table at the current schema version if it is missing.
    pub fn create_table(&mut self) -> Result<(), StoreError> {
        schema::migrate(&mut self.connection, &self.table)?;
        Ok(())
    }

    /// Delete every transaction, keeping the table.
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        self.require_table()?;
        self.connection
            .execute(&format!("DELETE FROM {}", self.table.qualified()), [])
            .map_err(|e| StoreError::query_failed(self.table.qualified(), e))
    }

    /// Borrow the underlying connection for ad-hoc SQL.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn require_table(&self) -> Result<(), StoreError> {
        if schema::table_exists(&self.connection, &self.table)? {
            Ok(())
        } else {
            Err(StoreError::schema(format!(
                "table {} does not exist",
                self.table
            )))
        }
    }
}

impl SalesStore for DuckDbStore {
    fn table(&self) -> &TableRef {
        &self.table
    }

    fn schema_version(&self) -> Result<u32, StoreError> {
        schema::schema_version(&self.connection, &self.table)
    }

    fn row_count(&self) -> Result<usize, StoreError> {
        self.require_table()?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.qualified());
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| StoreError::query_failed(self.table.qualified(), e))?;
        Ok(count as usize)
    }

    fn load_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        self.require_table()?;

        let sql = format!(
            r#"
            SELECT
                invoice_id, branch, city, customer_type, gender, product_line,
                CAST(unit_price AS VARCHAR),
                CAST(quantity AS BIGINT),
                CAST(tax_rate AS VARCHAR),
                CAST(total AS VARCHAR),
                CAST(cogs AS VARCHAR),
                CAST(gross_margin_pct AS VARCHAR),
                CAST(gross_income AS VARCHAR),
                CAST(rating AS VARCHAR),
                CAST(transaction_date AS VARCHAR),
                CAST(transaction_time AS VARCHAR),
                payment_method,
                time_period, day_of_week, month_name
            FROM {}
            ORDER BY invoice_id
            "#,
            self.table.qualified()
        );

        let mut stmt = self
            .connection
            .prepare(&sql)
            .map_err(|e| StoreError::query_failed(self.table.qualified(), e))?;

        let raw_rows = stmt
            .query_map([], |row| {
                Ok(RawRow {
                    invoice_id: row.get(0)?,
                    branch: row.get(1)?,
                    city: row.get(2)?,
                    customer_type: row.get(3)?,
                    gender: row.get(4)?,
                    product_line: row.get(5)?,
                    unit_price: row.get(6)?,
                    quantity: row.get(7)?,
                    tax_rate: row.get(8)?,
                    total: row.get(9)?,
                    cogs: row.get(10)?,
                    gross_margin_pct: row.get(11)?,
                    gross_income: row.get(12)?,
                    rating: row.get(13)?,
                    date: row.get(14)?,
                    time: row.get(15)?,
                    payment_method: row.get(16)?,
                    time_period: row.get(17)?,
                    day_of_week: row.get(18)?,
                    month_name: row.get(19)?,
                })
            })
            .map_err(|e| StoreError::query_failed(self.table.qualified(), e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::query_failed(self.table.qualified(), e))?;

        let mut seen = HashSet::with_capacity(raw_rows.len());
        let mut records = Vec::with_capacity(raw_rows.len());
        for raw in raw_rows {
            let record = raw.into_transaction()?;
            if !seen.insert(record.invoice_id.clone()) {
                return Err(RetailError::data(&record.invoice_id, "duplicate invoice_id").into());
            }
            records.push(record);
        }

        debug!(table = %self.table, rows = records.len(), "loaded transactions");
        Ok(records)
    }

    fn insert_transactions(&mut self, records: &[Transaction]) -> Result<usize, StoreError> {
        self.require_table()?;
        let table_name = self.table.qualified();

        let tx = self
            .connection
            .transaction()
            .map_err(|e| StoreError::query_failed(&table_name, e))?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    r#"
                    INSERT INTO {} (
                        invoice_id, branch, city, customer_type, gender, product_line,
                        unit_price, quantity, tax_rate, total, cogs, gross_margin_pct,
                        gross_income, rating, transaction_date, transaction_time, payment_method
                    ) VALUES (
                        ?, ?, ?, ?, ?, ?,
                        CAST(? AS DECIMAL(10,2)), ?, CAST(? AS DECIMAL(12,4)),
                        CAST(? AS DECIMAL(12,4)), CAST(? AS DECIMAL(12,2)),
                        CAST(? AS DECIMAL(11,9)), CAST(? AS DECIMAL(12,4)),
                        CAST(? AS DECIMAL(3,1)), CAST(? AS DATE), CAST(? AS TIME), ?
                    )
                    "#,
                    table_name
                ))
                .map_err(|e| StoreError::query_failed(&table_name, e))?;

            for record in records {
                stmt.execute(params![
                    record.invoice_id,
                    record.branch,
                    record.city,
                    record.customer_type,
                    record.gender,
                    record.product_line,
                    record.unit_price.to_string(),
                    record.quantity,
                    record.tax_rate.to_string(),
                    record.total.to_string(),
                    record.cogs.to_string(),
                    record.gross_margin_pct.to_string(),
                    record.gross_income.to_string(),
                    record.rating.map(|r| r.to_string()),
                    record.date.map(|d| d.format("%Y-%m-%d").to_string()),
                    record.time.map(|t| t.format("%H:%M:%S").to_string()),
                    record.payment_method,
                ])
                .map_err(|e| {
                    StoreError::query_failed(
                        format!("{} ({})", table_name, record.invoice_id),
                        e,
                    )
                })?;
            }
        }

        // invoice ids key the table; a clash with existing rows or within the
        // batch drops the transaction, rolling the whole insert back
        let duplicate: Option<String> = tx
            .query_row(
                &format!(
                    "SELECT MIN(invoice_id) FROM (SELECT invoice_id FROM {} GROUP BY invoice_id HAVING COUNT(*) > 1)",
                    table_name
                ),
                [],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::query_failed(&table_name, e))?;
        if let Some(invoice_id) = duplicate {
            return Err(RetailError::data(invoice_id, "duplicate invoice_id").into());
        }

        tx.commit()
            .map_err(|e| StoreError::query_failed(&table_name, e))?;

        info!(table = %self.table, rows = records.len(), "inserted transactions");
        Ok(records.len())
    }

    fn write_derived(
        &mut self,
        derived: &[(String, DerivedAttributes)],
    ) -> Result<usize, StoreError> {
        self.require_table()?;
        let table_name = self.table.qualified();

        let tx = self
            .connection
            .transaction()
            .map_err(|e| StoreError::query_failed(&table_name, e))?;

        tx.execute_batch(
            "CREATE OR REPLACE TEMP TABLE retail_derived_staging (
                invoice_id VARCHAR NOT NULL,
                time_period VARCHAR NOT NULL,
                day_of_week VARCHAR NOT NULL,
                month_name VARCHAR NOT NULL
            )",
        )
        .map_err(|e| StoreError::query_failed("retail_derived_staging", e))?;

        {
            let mut stmt = tx
                .prepare("INSERT INTO retail_derived_staging VALUES (?, ?, ?, ?)")
                .map_err(|e| StoreError::query_failed("retail_derived_staging", e))?;

            for (invoice_id, attributes) in derived {
                stmt.execute(params![
                    invoice_id,
                    attributes.time_period.as_str(),
                    attributes.day_name(),
                    attributes.month_name(),
                ])
                .map_err(|e| StoreError::query_failed("retail_derived_staging", e))?;
            }
        }

        let updated = tx
            .execute(
                &format!(
                    r#"
                    UPDATE {} AS tgt
                    SET time_period = staged.time_period,
                        day_of_week = staged.day_of_week,
                        month_name = staged.month_name
                    FROM retail_derived_staging AS staged
                    WHERE tgt.invoice_id = staged.invoice_id
                    "#,
                    table_name
                ),
                [],
            )
            .map_err(|e| StoreError::query_failed(&table_name, e))?;

        tx.execute_batch("DROP TABLE retail_derived_staging")
            .map_err(|e| StoreError::query_failed("retail_derived_staging", e))?;

        tx.commit()
            .map_err(|e| StoreError::query_failed(&table_name, e))?;

        Ok(updated)
    }
}

/// A row as read from DuckDB, before validation.
struct RawRow {
    invoice_id: Option<String>,
    branch: Option<String>,
    city: Option<String>,
    customer_type: Option<String>,
    gender: Option<String>,
    product_line: Option<String>,
    unit_price: Option<String>,
    quantity: Option<i64>,
    tax_rate: Option<String>,
    total: Option<String>,
    cogs: Option<String>,
    gross_margin_pct: Option<String>,
    gross_income: Option<String>,
    rating: Option<String>,
    date: Option<String>,
    time: Option<String>,
    payment_method: Option<String>,
    time_period: Option<String>,
    day_of_week: Option<String>,
    month_name: Option<String>,
}

impl RawRow {
    fn into_transaction(self) -> Result<Transaction, RetailError> {
        let invoice_id = self
            .invoice_id
            .ok_or_else(|| RetailError::data("<null>", "invoice_id is null"))?;
        let id = invoice_id.as_str();

        let derived = derived_attributes(
            id,
            self.time_period.as_deref(),
            self.day_of_week.as_deref(),
            self.month_name.as_deref(),
        )?;

        Ok(Transaction {
            branch: required(id, "branch", self.branch)?,
            city: required(id, "city", self.city)?,
            customer_type: required(id, "customer_type", self.customer_type)?,
            gender: required(id, "gender", self.gender)?,
            product_line: required(id, "product_line", self.product_line)?,
            unit_price: decimal(id, "unit_price", self.unit_price)?,
            quantity: required(id, "quantity", self.quantity)?,
            tax_rate: decimal(id, "tax_rate", self.tax_rate)?,
            total: decimal(id, "total", self.total)?,
            cogs: decimal(id, "cogs", self.cogs)?,
            gross_margin_pct: decimal(id, "gross_margin_pct", self.gross_margin_pct)?,
            gross_income: decimal(id, "gross_income", self.gross_income)?,
            rating: self
                .rating
                .map(|r| parse_decimal(id, "rating", &r))
                .transpose()?,
            date: self
                .date
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| {
                        RetailError::data(id, format!("invalid transaction_date '{}': {}", d, e))
                    })
                })
                .transpose()?,
            time: self
                .time
                .map(|t| {
                    NaiveTime::parse_from_str(&t, "%H:%M:%S%.f").map_err(|e| {
                        RetailError::data(id, format!("invalid transaction_time '{}': {}", t, e))
                    })
                })
                .transpose()?,
            payment_method: required(id, "payment_method", self.payment_method)?,
            derived,
            invoice_id,
        })
    }
}

fn required<T>(invoice_id: &str, column: &str, value: Option<T>) -> Result<T, RetailError> {
    value.ok_or_else(|| RetailError::data(invoice_id, format!("{} is null", column)))
}

fn decimal(invoice_id: &str, column: &str, value: Option<String>) -> Result<Decimal, RetailError> {
    parse_decimal(invoice_id, column, &required(invoice_id, column, value)?)
}

fn parse_decimal(invoice_id: &str, column: &str, value: &str) -> Result<Decimal, RetailError> {
    Decimal::from_str(value)
        .map_err(|e| RetailError::data(invoice_id, format!("invalid {} '{}': {}", column, value, e)))
}

/// Parse the persisted derived columns. All three are set together by
/// enrichment, so a partial set means the row was edited out of band.
fn derived_attributes(
    invoice_id: &str,
    time_period: Option<&str>,
    day_of_week: Option<&str>,
    month_name: Option<&str>,
) -> Result<Option<DerivedAttributes>, RetailError> {
    match (time_period, day_of_week, month_name) {
        (None, None, None) => Ok(None),
        (Some(period), Some(day), Some(month)) => {
            let time_period = TimePeriod::from_str(period)
                .map_err(|e| RetailError::data(invoice_id, e))?;
            let day_of_week = parse_weekday(day)
                .ok_or_else(|| RetailError::data(invoice_id, format!("invalid day_of_week '{}'", day)))?;
            let month = parse_month(month)
                .ok_or_else(|| RetailError::data(invoice_id, format!("invalid month_name '{}'", month)))?;

            Ok(Some(DerivedAttributes {
                time_period,
                day_of_week,
                month,
            }))
        }
        _ => Err(RetailError::data(
            invoice_id,
            "derived columns are partially populated",
        )),
    }
}
