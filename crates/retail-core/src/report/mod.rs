//! The fixed report catalog.
//!
//! Every report is a pure function from an enriched record set to an ordered
//! list of rows. Reports that group by a derived attribute require the
//! enrichment backfill to have run first.

mod aggregate;
mod types;

pub use aggregate::{round_half_up, Aggregate, GroupedAggregate, RowOrder};
pub use types::{Measure, Report, ReportRow};

use crate::derive::{checked_rating, quarter, rating_bin};
use crate::error::RetailError;
use crate::record::{DerivedAttributes, Transaction};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A named report in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    UniqueCities,
    BranchCityList,
    TopCategoriesByQty,
    MonthlyRevenue,
    CategoryRevenue,
    RevenueByCustomerType,
    GenderDistribution,
    GenderProductPreference,
    CityRevenue,
    BranchRevenue,
    RevenueByPeriod,
    AvgRatingByPeriod,
    AvgRatingByDay,
    AvgTaxByCity,
    AvgTaxByCustomerType,
    QuarterlyRevenue,
    RatingHistogram,
}

type KeyFn = fn(&Transaction) -> Result<Vec<String>, RetailError>;
type ValueFn = fn(&Transaction) -> Result<Option<Decimal>, RetailError>;

/// How a grouped report is computed.
struct GroupedPlan {
    key: KeyFn,
    value: ValueFn,
    aggregate: Aggregate,
    order: RowOrder,
}

impl ReportKind {
    pub const ALL: [ReportKind; 17] = [
        ReportKind::UniqueCities,
        ReportKind::BranchCityList,
        ReportKind::TopCategoriesByQty,
        ReportKind::MonthlyRevenue,
        ReportKind::CategoryRevenue,
        ReportKind::RevenueByCustomerType,
        ReportKind::GenderDistribution,
        ReportKind::GenderProductPreference,
        ReportKind::CityRevenue,
        ReportKind::BranchRevenue,
        ReportKind::RevenueByPeriod,
        ReportKind::AvgRatingByPeriod,
        ReportKind::AvgRatingByDay,
        ReportKind::AvgTaxByCity,
        ReportKind::AvgTaxByCustomerType,
        ReportKind::QuarterlyRevenue,
        ReportKind::RatingHistogram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::UniqueCities => "unique_cities",
            ReportKind::BranchCityList => "branch_city_list",
            ReportKind::TopCategoriesByQty => "top_categories_by_qty",
            ReportKind::MonthlyRevenue => "monthly_revenue",
            ReportKind::CategoryRevenue => "category_revenue",
            ReportKind::RevenueByCustomerType => "revenue_by_customer_type",
            ReportKind::GenderDistribution => "gender_distribution",
            ReportKind::GenderProductPreference => "gender_product_preference",
            ReportKind::CityRevenue => "city_revenue",
            ReportKind::BranchRevenue => "branch_revenue",
            ReportKind::RevenueByPeriod => "revenue_by_period",
            ReportKind::AvgRatingByPeriod => "avg_rating_by_period",
            ReportKind::AvgRatingByDay => "avg_rating_by_day",
            ReportKind::AvgTaxByCity => "avg_tax_by_city",
            ReportKind::AvgTaxByCustomerType => "avg_tax_by_customer_type",
            ReportKind::QuarterlyRevenue => "quarterly_revenue",
            ReportKind::RatingHistogram => "rating_histogram",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::UniqueCities => "Number of distinct cities",
            ReportKind::BranchCityList => "Distinct branch and city pairs",
            ReportKind::TopCategoriesByQty => "Units sold per product line",
            ReportKind::MonthlyRevenue => "Revenue per month",
            ReportKind::CategoryRevenue => "Revenue per product line",
            ReportKind::RevenueByCustomerType => "Revenue per customer type",
            ReportKind::GenderDistribution => "Customers per gender within each branch",
            ReportKind::GenderProductPreference => "Sales per gender and product line",
            ReportKind::CityRevenue => "Revenue per city",
            ReportKind::BranchRevenue => "Revenue per branch",
            ReportKind::RevenueByPeriod => "Revenue per time of day",
            ReportKind::AvgRatingByPeriod => "Average rating per time of day",
            ReportKind::AvgRatingByDay => "Average rating per weekday",
            ReportKind::AvgTaxByCity => "Average VAT per city",
            ReportKind::AvgTaxByCustomerType => "Average VAT per customer type",
            ReportKind::QuarterlyRevenue => "Revenue per calendar quarter",
            ReportKind::RatingHistogram => "Transactions per rating bucket",
        }
    }

    /// Output column names of the grouping keys.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            ReportKind::UniqueCities => &[],
            ReportKind::BranchCityList => &["branch", "city"],
            ReportKind::TopCategoriesByQty
            | ReportKind::CategoryRevenue => &["product_line"],
            ReportKind::MonthlyRevenue => &["month_name"],
            ReportKind::RevenueByCustomerType
            | ReportKind::AvgTaxByCustomerType => &["customer_type"],
            ReportKind::GenderDistribution => &["branch", "gender"],
            ReportKind::GenderProductPreference => &["gender", "product_line"],
            ReportKind::CityRevenue | ReportKind::AvgTaxByCity => &["city"],
            ReportKind::BranchRevenue => &["branch"],
            ReportKind::RevenueByPeriod | ReportKind::AvgRatingByPeriod => &["time_period"],
            ReportKind::AvgRatingByDay => &["day_of_week"],
            ReportKind::QuarterlyRevenue => &["quarter"],
            ReportKind::RatingHistogram => &["rating_bin"],
        }
    }

    /// Output column name of the aggregate, if the report has one.
    pub fn value_column(&self) -> Option<&'static str> {
        match self {
            ReportKind::UniqueCities => Some("unique_cities"),
            ReportKind::BranchCityList => None,
            ReportKind::TopCategoriesByQty => Some("total_quantity"),
            ReportKind::MonthlyRevenue
            | ReportKind::CategoryRevenue
            | ReportKind::RevenueByCustomerType
            | ReportKind::CityRevenue
            | ReportKind::BranchRevenue
            | ReportKind::RevenueByPeriod
            | ReportKind::QuarterlyRevenue => Some("total_revenue"),
            ReportKind::GenderDistribution
            | ReportKind::GenderProductPreference
            | ReportKind::RatingHistogram => Some("transactions"),
            ReportKind::AvgRatingByPeriod | ReportKind::AvgRatingByDay => Some("avg_rating"),
            ReportKind::AvgTaxByCity | ReportKind::AvgTaxByCustomerType => Some("avg_tax"),
        }
    }

    /// Whether the aggregate counts rows instead of summing or averaging
    /// amounts.
    pub fn is_count(&self) -> bool {
        matches!(
            self,
            ReportKind::UniqueCities
                | ReportKind::GenderDistribution
                | ReportKind::GenderProductPreference
                | ReportKind::RatingHistogram
        )
    }

    /// Run this report over a record set.
    pub fn run(&self, records: &[Transaction]) -> Result<Report, RetailError> {
        let rows = match (self, self.grouped_plan()) {
            (_, Some(plan)) => {
                let mut agg = GroupedAggregate::new(plan.aggregate);
                for record in records {
                    agg.add((plan.key)(record)?, (plan.value)(record)?);
                }
                agg.finish(plan.order)
            }
            (ReportKind::UniqueCities, None) => {
                let cities: BTreeSet<&str> = records.iter().map(|r| r.city.as_str()).collect();
                vec![ReportRow::new(
                    Vec::new(),
                    Some(Measure::Count(cities.len() as u64)),
                )]
            }
            // branch_city_list
            (_, None) => records
                .iter()
                .map(|r| (r.branch.as_str(), r.city.as_str()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|(branch, city)| {
                    ReportRow::new(vec![branch.to_string(), city.to_string()], None)
                })
                .collect(),
        };

        Ok(Report { kind: *self, rows })
    }

    /// How a grouped report is computed, or `None` for the scalar and
    /// listing reports.
    fn grouped_plan(&self) -> Option<GroupedPlan> {
        use Aggregate::{Avg, Count, Sum};
        use RowOrder::{FirstKeyThenValueDesc, KeyAsc, ValueDesc};

        let (key, value, aggregate, order): (KeyFn, ValueFn, _, _) = match self {
            ReportKind::TopCategoriesByQty => (by_product_line, quantity, Sum, ValueDesc),
            ReportKind::MonthlyRevenue => (by_month, total, Sum, ValueDesc),
            ReportKind::CategoryRevenue => (by_product_line, total, Sum, ValueDesc),
            ReportKind::RevenueByCustomerType => (by_customer_type, total, Sum, ValueDesc),
            ReportKind::GenderDistribution => {
                (by_branch_gender, no_value, Count, FirstKeyThenValueDesc)
            }
            ReportKind::GenderProductPreference => {
                (by_gender_product_line, no_value, Count, ValueDesc)
            }
            ReportKind::CityRevenue => (by_city, total, Sum, ValueDesc),
            ReportKind::BranchRevenue => (by_branch, total, Sum, ValueDesc),
            ReportKind::RevenueByPeriod => (by_time_period, total, Sum, ValueDesc),
            ReportKind::AvgRatingByPeriod => (by_time_period, rating, Avg, ValueDesc),
            ReportKind::AvgRatingByDay => (by_day, rating, Avg, ValueDesc),
            ReportKind::AvgTaxByCity => (by_city, tax, Avg, ValueDesc),
            ReportKind::AvgTaxByCustomerType => (by_customer_type, tax, Avg, ValueDesc),
            ReportKind::QuarterlyRevenue => (by_quarter, total, Sum, KeyAsc),
            ReportKind::RatingHistogram => (by_rating_bin, no_value, Count, KeyAsc),
            ReportKind::UniqueCities | ReportKind::BranchCityList => return None,
        };

        Some(GroupedPlan {
            key,
            value,
            aggregate,
            order,
        })
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = RetailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| RetailError::UnknownReport {
                name: s.to_string(),
            })
    }
}

/// Run every report in catalog order.
pub fn run_all(records: &[Transaction]) -> Result<Vec<Report>, RetailError> {
    ReportKind::ALL.iter().map(|kind| kind.run(records)).collect()
}

fn enriched(record: &Transaction) -> Result<&DerivedAttributes, RetailError> {
    record.derived.as_ref().ok_or_else(|| {
        RetailError::data(
            &record.invoice_id,
            "derived attributes missing; run enrichment first",
        )
    })
}

fn by_product_line(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.product_line.clone()])
}

fn by_customer_type(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.customer_type.clone()])
}

fn by_city(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.city.clone()])
}

fn by_branch(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.branch.clone()])
}

fn by_branch_gender(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.branch.clone(), r.gender.clone()])
}

fn by_gender_product_line(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![r.gender.clone(), r.product_line.clone()])
}

fn by_month(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![enriched(r)?.month_name().to_string()])
}

fn by_time_period(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![enriched(r)?.time_period.to_string()])
}

fn by_day(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![enriched(r)?.day_name().to_string()])
}

fn by_quarter(r: &Transaction) -> Result<Vec<String>, RetailError> {
    let date = r
        .date
        .ok_or_else(|| RetailError::data(&r.invoice_id, "transaction_date is null"))?;
    Ok(vec![quarter(date).to_string()])
}

fn by_rating_bin(r: &Transaction) -> Result<Vec<String>, RetailError> {
    Ok(vec![rating_bin(r)?.label().to_string()])
}

fn total(r: &Transaction) -> Result<Option<Decimal>, RetailError> {
    Ok(Some(r.total))
}

fn quantity(r: &Transaction) -> Result<Option<Decimal>, RetailError> {
    Ok(Some(Decimal::from(r.quantity)))
}

fn tax(r: &Transaction) -> Result<Option<Decimal>, RetailError> {
    Ok(Some(r.tax_rate))
}

fn rating(r: &Transaction) -> Result<Option<Decimal>, RetailError> {
    checked_rating(r)
}

fn no_value(_: &Transaction) -> Result<Option<Decimal>, RetailError> {
    Ok(None)
}
