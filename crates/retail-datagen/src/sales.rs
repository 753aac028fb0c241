//! Point-of-sale transaction generator.

use crate::generators::*;
use chrono::{Days, NaiveDate, NaiveTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use retail_core::Transaction;
use rust_decimal::Decimal;

/// Branch codes and the city each branch is in.
pub const STORES: [(&str, &str); 3] = [("A", "Yangon"), ("B", "Mandalay"), ("C", "Naypyitaw")];

pub const PRODUCT_LINES: [&str; 6] = [
    "Electronic accessories",
    "Fashion accessories",
    "Food and beverages",
    "Health and beauty",
    "Home and lifestyle",
    "Sports and travel",
];

/// VAT applied to the cost of goods.
const VAT_PERCENT: i64 = 5;

/// Gross income as a percentage of the total: 5 / 105.
fn gross_margin_pct() -> Decimal {
    Decimal::new(4_761_904_762, 9)
}

/// Settings for a generated sales table.
#[derive(Debug, Clone)]
pub struct SalesConfig {
    pub seed: u64,
    pub start_date: NaiveDate,
    /// Number of days sales are spread over, starting at `start_date`.
    pub days: u32,
    pub rows: usize,
    /// Share of sales with no customer rating.
    pub missing_rating_rate: f64,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            days: 90,
            rows: 1000,
            missing_rating_rate: 0.02,
        }
    }
}

/// Produces a deterministic stream of sales for a config.
///
/// The same config always yields the same transactions.
pub struct SalesGenerator {
    config: SalesConfig,
    rng: ChaCha8Rng,
    next: usize,
    store: WeightedChoice<(&'static str, &'static str)>,
    product_line: WeightedChoice<&'static str>,
    customer_type: WeightedChoice<&'static str>,
    gender: WeightedChoice<&'static str>,
    payment: WeightedChoice<&'static str>,
    unit_price: Box<dyn Gen<Decimal>>,
    quantity: IntRange,
    rating: Sometimes<Score>,
    day_offset: IntRange,
    minute_of_day: IntRange,
}

impl SalesGenerator {
    pub fn new(config: SalesConfig) -> Self {
        let last_day = i64::from(config.days.max(1)) - 1;
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next: 0,
            store: one_of(STORES.to_vec()),
            product_line: one_of(PRODUCT_LINES.to_vec()),
            customer_type: one_of(vec!["Member", "Normal"]),
            gender: one_of(vec!["Female", "Male"]),
            payment: weighted_choice(vec![
                ("Ewallet", 0.35),
                ("Cash", 0.35),
                ("Credit card", 0.30),
            ]),
            unit_price: Box::new(money(1000..=9999)),
            quantity: int_range(1..=10),
            rating: sometimes_missing(score(7.0, 1.7, 4.0, 10.0), config.missing_rating_rate),
            day_offset: int_range(0..=last_day),
            // stores open 10:00 to 21:00
            minute_of_day: int_range(10 * 60..=21 * 60 - 1),
            config,
        }
    }

    pub fn config(&self) -> &SalesConfig {
        &self.config
    }

    fn sale(&mut self, index: usize) -> Transaction {
        let rng = &mut self.rng;
        let (branch, city) = self.store.generate(rng);

        let unit_price = self.unit_price.generate(rng);
        let quantity = self.quantity.generate(rng);
        let cogs = unit_price * Decimal::from(quantity);
        let tax = cogs * Decimal::new(VAT_PERCENT, 2);

        let date = self
            .config
            .start_date
            .checked_add_days(Days::new(self.day_offset.generate(rng) as u64));
        let minute = self.minute_of_day.generate(rng) as u32;
        let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0);

        Transaction {
            invoice_id: invoice_id(index),
            branch: branch.to_string(),
            city: city.to_string(),
            customer_type: self.customer_type.generate(rng).to_string(),
            gender: self.gender.generate(rng).to_string(),
            product_line: self.product_line.generate(rng).to_string(),
            unit_price,
            quantity,
            tax_rate: tax,
            total: cogs + tax,
            cogs,
            gross_margin_pct: gross_margin_pct(),
            gross_income: tax,
            rating: self.rating.generate(rng),
            date,
            time,
            payment_method: self.payment.generate(rng).to_string(),
            derived: None,
        }
    }
}

impl Iterator for SalesGenerator {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        if self.next >= self.config.rows {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.sale(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.rows.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Invoice ids look like "100-00-0001" and are unique per index.
fn invoice_id(index: usize) -> String {
    format!(
        "{:03}-{:02}-{:04}",
        100 + (index / 1_000_000) % 900,
        (index / 10_000) % 100,
        index % 10_000
    )
}

/// Generate a full sales table for a config.
pub fn generate_sales(config: SalesConfig) -> Vec<Transaction> {
    SalesGenerator::new(config).collect()
}
