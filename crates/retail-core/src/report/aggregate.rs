//! Grouped aggregation: key -> running state, finalize, sort.

use super::types::{Measure, ReportRow};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Aggregate function applied per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Count,
    /// Mean of the non-null inputs, rounded half-up to 2 decimal places.
    Avg,
}

/// Output row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Largest aggregate first; equal aggregates by key ascending.
    ValueDesc,
    /// Key ascending.
    KeyAsc,
    /// First key ascending, then largest aggregate first within it.
    FirstKeyThenValueDesc,
}

#[derive(Debug, Default, Clone)]
struct Accumulator {
    rows: u64,
    values: u64,
    sum: Decimal,
}

/// Running per-group aggregate state.
#[derive(Debug)]
pub struct GroupedAggregate {
    aggregate: Aggregate,
    groups: BTreeMap<Vec<String>, Accumulator>,
}

impl GroupedAggregate {
    pub fn new(aggregate: Aggregate) -> Self {
        Self {
            aggregate,
            groups: BTreeMap::new(),
        }
    }

    /// Feed one input row. `None` values count as rows but not as values.
    pub fn add(&mut self, key: Vec<String>, value: Option<Decimal>) {
        let acc = self.groups.entry(key).or_default();
        acc.rows += 1;
        if let Some(value) = value {
            acc.values += 1;
            acc.sum += value;
        }
    }

    /// Finalize every group and sort the rows.
    pub fn finish(self, order: RowOrder) -> Vec<ReportRow> {
        let aggregate = self.aggregate;

        // BTreeMap iteration is key-ascending and sort_by is stable, which
        // gives the key tie-break for free.
        let mut rows: Vec<ReportRow> = self
            .groups
            .into_iter()
            .map(|(keys, acc)| ReportRow::new(keys, finalize(aggregate, &acc)))
            .collect();

        match order {
            RowOrder::KeyAsc => {}
            RowOrder::ValueDesc => rows.sort_by(|a, b| Measure::cmp_desc(&a.value, &b.value)),
            RowOrder::FirstKeyThenValueDesc => rows.sort_by(|a, b| {
                a.keys
                    .first()
                    .cmp(&b.keys.first())
                    .then_with(|| Measure::cmp_desc(&a.value, &b.value))
            }),
        }

        rows
    }
}

fn finalize(aggregate: Aggregate, acc: &Accumulator) -> Option<Measure> {
    match aggregate {
        Aggregate::Count => Some(Measure::Count(acc.rows)),
        Aggregate::Sum => (acc.values > 0).then_some(Measure::Amount(acc.sum)),
        Aggregate::Avg => (acc.values > 0)
            .then(|| Measure::Amount(round_half_up(acc.sum / Decimal::from(acc.values)))),
    }
}

/// Round to exactly two decimal places, ties away from zero.
pub fn round_half_up(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
