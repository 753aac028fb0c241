//! Sales table storage for retail analytics.
//!
//! This crate defines the interface a sales store implements and a DuckDB
//! implementation. The store owns the persisted table: schema migrations,
//! the enrichment backfill, and loading snapshots for the report catalog.

mod duckdb_store;
mod error;
pub mod schema;
mod types;

pub use duckdb_store::DuckDbStore;
pub use error::StoreError;
pub use types::{EnrichmentSummary, ReportResult, TableRef};

use retail_core::{derive_all, DerivedAttributes, ReportKind, Transaction};
use std::time::Instant;
use tracing::info;

/// Abstract interface for a sales table.
///
/// Stores are responsible for:
/// - Loading a snapshot of every transaction
/// - Writing derived attributes in a single transaction
/// - Reporting the schema version of the table
pub trait SalesStore {
    /// The table this store reads and writes.
    fn table(&self) -> &TableRef;

    /// Schema version of the table (0 when it does not exist yet).
    fn schema_version(&self) -> Result<u32, StoreError>;

    /// Number of transactions in the table.
    fn row_count(&self) -> Result<usize, StoreError>;

    /// Load every transaction, ordered by invoice id.
    fn load_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Insert transactions in one transaction.
    fn insert_transactions(&mut self, records: &[Transaction]) -> Result<usize, StoreError>;

    /// Persist derived attributes keyed by invoice id, all-or-nothing.
    ///
    /// Returns the number of rows updated.
    fn write_derived(&mut self, derived: &[(String, DerivedAttributes)])
        -> Result<usize, StoreError>;

    /// Backfill derived attributes onto every row.
    ///
    /// Every attribute is computed before anything is written, so a single
    /// bad row leaves the table untouched.
    fn enrich(&mut self) -> Result<EnrichmentSummary, StoreError> {
        let start = Instant::now();

        let records = self.load_transactions()?;
        let derived = derive_all(&records)?;
        let rows_enriched = self.write_derived(&derived)?;

        let duration = start.elapsed();
        info!(
            table = %self.table(),
            rows = rows_enriched,
            ?duration,
            "enrichment complete"
        );

        Ok(EnrichmentSummary {
            rows_enriched,
            duration,
        })
    }

    /// Run one report over a fresh snapshot.
    fn run_report(&self, kind: ReportKind) -> Result<ReportResult, StoreError> {
        let mut results = self.run_reports(&[kind])?;
        results
            .pop()
            .ok_or_else(|| StoreError::Other(anyhow::anyhow!("report {} produced no result", kind)))
    }

    /// Run several reports over one snapshot.
    fn run_reports(&self, kinds: &[ReportKind]) -> Result<Vec<ReportResult>, StoreError> {
        let records = self.load_transactions()?;

        kinds
            .iter()
            .map(|kind| -> Result<ReportResult, StoreError> {
                let start = Instant::now();
                let report = kind.run(&records)?;
                let duration = start.elapsed();
                info!(report = kind.name(), rows = report.len(), ?duration, "report complete");

                Ok(ReportResult {
                    report,
                    source_rows: records.len(),
                    duration,
                })
            })
            .collect()
    }
}
