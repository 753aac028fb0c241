//! The point-of-sale transaction record.

use crate::derive::{month_name, weekday_name, TimePeriod};
use chrono::{Month, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;

/// One row of the sales fact table.
///
/// Base fields are written once by the loader. `derived` is `None` until the
/// enrichment backfill has run for this row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    /// Unique invoice identifier.
    pub invoice_id: String,

    /// Branch code (e.g. "A").
    pub branch: String,

    pub city: String,

    /// Customer category (e.g. "Member", "Normal").
    pub customer_type: String,

    pub gender: String,

    /// Product category.
    pub product_line: String,

    pub unit_price: Decimal,

    pub quantity: i64,

    /// VAT charged on the line.
    pub tax_rate: Decimal,

    /// Total sales amount including tax.
    pub total: Decimal,

    /// Cost of goods sold.
    pub cogs: Decimal,

    pub gross_margin_pct: Decimal,

    pub gross_income: Decimal,

    /// Customer rating on a 0-10 scale, absent when the customer gave none.
    pub rating: Option<Decimal>,

    pub date: Option<NaiveDate>,

    pub time: Option<NaiveTime>,

    pub payment_method: String,

    pub derived: Option<DerivedAttributes>,
}

/// Attributes computed from a transaction's date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAttributes {
    pub time_period: TimePeriod,
    pub day_of_week: Weekday,
    pub month: Month,
}

impl DerivedAttributes {
    /// Full English weekday name, e.g. "Saturday".
    pub fn day_name(&self) -> &'static str {
        weekday_name(self.day_of_week)
    }

    /// Full English month name, e.g. "January".
    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }
}
