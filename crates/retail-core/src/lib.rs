//! Retail sales analytics core.
//!
//! This crate defines the point-of-sale transaction record, the derived
//! attributes backfilled onto it (time of day, weekday, month), and the fixed
//! catalog of aggregate reports run over an enriched record set. It has no
//! storage dependency; see `retail-store` for the DuckDB-backed table.

pub mod derive;
mod enrich;
mod error;
mod record;
pub mod report;

pub use derive::{derive_attributes, rating_bin, time_period, RatingBin, TimePeriod};
pub use enrich::{derive_all, enrich};
pub use error::RetailError;
pub use record::{DerivedAttributes, Transaction};
pub use report::{run_all, Measure, Report, ReportKind, ReportRow};
