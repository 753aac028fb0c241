//! Error types for enrichment and reporting.

use thiserror::Error;

/// Errors raised while deriving attributes or running reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetailError {
    /// A structural precondition on the sales table does not hold.
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// A required field is null or out of domain.
    #[error("Data error in transaction '{invoice_id}': {message}")]
    Data { invoice_id: String, message: String },

    /// No report with this name exists in the catalog.
    #[error("Unknown report: {name}")]
    UnknownReport { name: String },
}

impl RetailError {
    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a data error for a specific transaction.
    pub fn data(invoice_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            invoice_id: invoice_id.into(),
            message: message.into(),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }
}
