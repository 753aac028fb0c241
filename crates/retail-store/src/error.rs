//! Store error types.

use retail_core::RetailError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Failed to execute a SQL statement.
    #[error("Query failed for '{context}': {message}")]
    QueryFailed { context: String, message: String },

    /// Schema or data precondition violated.
    #[error(transparent)]
    Retail(#[from] RetailError),

    /// Generic store error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a query failed error.
    pub fn query_failed(context: impl Into<String>, message: impl ToString) -> Self {
        Self::QueryFailed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Retail(RetailError::schema(message))
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Retail(e) if e.is_schema())
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Retail(e) if e.is_data())
    }
}
