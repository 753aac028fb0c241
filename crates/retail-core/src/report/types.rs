//! Report output types.

use super::ReportKind;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// Aggregate value of one report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Row or distinct-value count.
    Count(u64),
    /// Exact decimal sum or rounded average.
    Amount(Decimal),
}

impl Measure {
    pub fn as_decimal(&self) -> Decimal {
        match self {
            Measure::Count(n) => Decimal::from(*n),
            Measure::Amount(d) => *d,
        }
    }

    /// Order two optional measures largest first, nulls last.
    pub(crate) fn cmp_desc(a: &Option<Measure>, b: &Option<Measure>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => b.as_decimal().cmp(&a.as_decimal()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Count(n) => write!(f, "{}", n),
            Measure::Amount(d) => write!(f, "{}", d),
        }
    }
}

/// One output row: group key values and the aggregate.
///
/// `value` is `None` for listing reports without an aggregate, and for
/// averages over a group whose inputs were all absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub keys: Vec<String>,
    pub value: Option<Measure>,
}

impl ReportRow {
    pub fn new(keys: Vec<String>, value: Option<Measure>) -> Self {
        Self { keys, value }
    }
}

/// Result of running a report over a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up the value of the row with exactly these keys.
    pub fn value_of(&self, keys: &[&str]) -> Option<Measure> {
        self.rows
            .iter()
            .find(|row| row.keys.iter().map(String::as_str).eq(keys.iter().copied()))
            .and_then(|row| row.value)
    }
}
