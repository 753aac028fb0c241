//! Common types used across stores.

use retail_core::Report;
use std::fmt;
use std::time::Duration;

/// Schema-qualified name of the sales table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name`, for use in SQL.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl Default for TableRef {
    fn default() -> Self {
        Self::new("main", "sales")
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Result of an enrichment backfill.
#[derive(Debug)]
pub struct EnrichmentSummary {
    /// Number of rows whose derived columns were written.
    pub rows_enriched: usize,

    /// How long the backfill took.
    pub duration: Duration,
}

/// Result of running one report against the store.
#[derive(Debug)]
pub struct ReportResult {
    pub report: Report,

    /// Number of transactions the report was computed over.
    pub source_rows: usize,

    pub duration: Duration,
}
