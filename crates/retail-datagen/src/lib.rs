//! Deterministic synthetic sales data.
//!
//! Composable generators seeded from a single value, used to fill a sales
//! table for demos and tests. The same seed always produces the same rows.

pub mod generators;
pub mod sales;

pub use generators::Gen;
pub use sales::{generate_sales, SalesConfig, SalesGenerator, PRODUCT_LINES, STORES};
