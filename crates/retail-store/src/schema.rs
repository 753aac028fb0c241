//! Sales table schema and versioned migrations.
//!
//! Version 1 is the base table as written by the loader. Version 2 adds the
//! derived columns filled by enrichment. The applied version is recorded per
//! table in `retail_schema_version`, so each migration runs at most once.

use crate::error::StoreError;
use crate::types::TableRef;
use duckdb::{params, Connection};
use std::collections::HashMap;
use tracing::{debug, info};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

const VERSION_TABLE: &str = "retail_schema_version";

/// Base columns and their DuckDB types.
pub const BASE_COLUMNS: [(&str, &str); 17] = [
    ("invoice_id", "VARCHAR NOT NULL"),
    ("branch", "VARCHAR NOT NULL"),
    ("city", "VARCHAR NOT NULL"),
    ("customer_type", "VARCHAR NOT NULL"),
    ("gender", "VARCHAR NOT NULL"),
    ("product_line", "VARCHAR NOT NULL"),
    ("unit_price", "DECIMAL(10,2) NOT NULL"),
    ("quantity", "INTEGER NOT NULL"),
    ("tax_rate", "DECIMAL(12,4) NOT NULL"),
    ("total", "DECIMAL(12,4) NOT NULL"),
    ("cogs", "DECIMAL(12,2) NOT NULL"),
    ("gross_margin_pct", "DECIMAL(11,9) NOT NULL"),
    ("gross_income", "DECIMAL(12,4) NOT NULL"),
    ("rating", "DECIMAL(3,1)"),
    ("transaction_date", "DATE"),
    ("transaction_time", "TIME"),
    ("payment_method", "VARCHAR NOT NULL"),
];

/// Derived columns written by enrichment. All are VARCHAR.
pub const DERIVED_COLUMNS: [&str; 3] = ["time_period", "day_of_week", "month_name"];

struct Migration {
    version: u32,
    description: &'static str,
    statements: fn(&TableRef) -> Vec<String>,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        description: "create sales table",
        statements: create_base_table,
    },
    Migration {
        version: 2,
        description: "add derived columns",
        statements: add_derived_columns,
    },
];

fn create_base_table(table: &TableRef) -> Vec<String> {
    let columns = BASE_COLUMNS
        .iter()
        .map(|(name, ty)| format!("    {} {}", name, ty))
        .collect::<Vec<_>>()
        .join(",\n");

    vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        table.qualified(),
        columns
    )]
}

fn add_derived_columns(table: &TableRef) -> Vec<String> {
    DERIVED_COLUMNS
        .iter()
        .map(|column| {
            format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} VARCHAR",
                table.qualified(),
                column
            )
        })
        .collect()
}

/// Check whether the table exists in the information schema.
pub fn table_exists(conn: &Connection, table: &TableRef) -> Result<bool, StoreError> {
    let query = "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_schema = ? AND table_name = ?";
    conn.query_row(query, params![table.schema, table.name], |row| row.get(0))
        .map_err(|e| StoreError::query_failed("table_exists", e))
}

/// The schema version recorded for a table.
///
/// A table with no bookkeeping row was created by an external loader and is
/// treated as version 1. A missing table is version 0.
pub fn schema_version(conn: &Connection, table: &TableRef) -> Result<u32, StoreError> {
    if !table_exists(conn, table)? {
        return Ok(0);
    }

    let versions = TableRef::new(&table.schema, VERSION_TABLE);
    if !table_exists(conn, &versions)? {
        return Ok(1);
    }

    let sql = format!(
        "SELECT MAX(version) FROM {} WHERE table_name = ?",
        versions.qualified()
    );
    let version: Option<i32> = conn
        .query_row(&sql, params![table.name], |row| row.get(0))
        .map_err(|e| StoreError::query_failed(VERSION_TABLE, e))?;

    Ok(version.map(|v| v.max(1) as u32).unwrap_or(1))
}

/// Apply every migration newer than the recorded version, then verify the
/// resulting columns.
///
/// Each migration runs in its own transaction together with its version bump.
/// The final migration verifies the columns before it commits, so a table
/// that cannot reach the current version is left as it was.
pub fn migrate(conn: &mut Connection, table: &TableRef) -> Result<u32, StoreError> {
    let current = schema_version(conn, table)?;
    let versions = TableRef::new(&table.schema, VERSION_TABLE);

    if current >= CURRENT_SCHEMA_VERSION {
        verify_columns(conn, table)?;
        return Ok(CURRENT_SCHEMA_VERSION);
    }

    // ADD COLUMN IF NOT EXISTS skips a column of the wrong type silently
    check_derived_types(&column_types(conn, table)?, table)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            table = %table,
            version = migration.version,
            "Applying migration: {}",
            migration.description
        );

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::query_failed("migration", e))?;

        for statement in (migration.statements)(table) {
            debug!(sql = %statement, "migration statement");
            tx.execute_batch(&statement)
                .map_err(|e| StoreError::query_failed(migration.description, e))?;
        }

        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (table_name VARCHAR NOT NULL, version INTEGER NOT NULL)",
            versions.qualified()
        ))
        .map_err(|e| StoreError::query_failed(VERSION_TABLE, e))?;
        tx.execute(
            &format!("DELETE FROM {} WHERE table_name = ?", versions.qualified()),
            params![table.name],
        )
        .map_err(|e| StoreError::query_failed(VERSION_TABLE, e))?;
        tx.execute(
            &format!("INSERT INTO {} VALUES (?, ?)", versions.qualified()),
            params![table.name, migration.version as i32],
        )
        .map_err(|e| StoreError::query_failed(VERSION_TABLE, e))?;

        // dropping the transaction on error rolls the migration back
        if migration.version == CURRENT_SCHEMA_VERSION {
            verify_columns(&tx, table)?;
        }

        tx.commit()
            .map_err(|e| StoreError::query_failed("migration", e))?;
    }

    Ok(CURRENT_SCHEMA_VERSION)
}

/// Check that every base column exists and the derived columns are VARCHAR.
pub fn verify_columns(conn: &Connection, table: &TableRef) -> Result<(), StoreError> {
    let columns = column_types(conn, table)?;

    let missing: Vec<&str> = BASE_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .chain(DERIVED_COLUMNS)
        .filter(|name| !columns.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::schema(format!(
            "{} is missing columns: {}",
            table,
            missing.join(", ")
        )));
    }

    check_derived_types(&columns, table)
}

/// Derived columns that are present must be VARCHAR.
fn check_derived_types(
    columns: &HashMap<String, String>,
    table: &TableRef,
) -> Result<(), StoreError> {
    for column in DERIVED_COLUMNS {
        match columns.get(column) {
            Some(data_type) if data_type != "VARCHAR" => {
                return Err(StoreError::schema(format!(
                    "{}.{} has type {}, expected VARCHAR",
                    table, column, data_type
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn column_types(conn: &Connection, table: &TableRef) -> Result<HashMap<String, String>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name, data_type FROM information_schema.columns WHERE table_schema = ? AND table_name = ?",
        )
        .map_err(|e| StoreError::query_failed("information_schema.columns", e))?;

    let rows = stmt
        .query_map(params![table.schema, table.name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| StoreError::query_failed("information_schema.columns", e))?;

    rows.collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| StoreError::query_failed("information_schema.columns", e))
}
