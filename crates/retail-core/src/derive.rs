//! Derived attributes: time-of-day buckets, calendar names, rating bins.
//!
//! Every function here is deterministic and locale-independent, so re-running
//! the enrichment over the same base columns always yields the same values.

use crate::error::RetailError;
use crate::record::{DerivedAttributes, Transaction};
use chrono::{Datelike, Month, NaiveDate, NaiveTime, Timelike, Weekday};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
    (Weekday::Sat, "Saturday"),
    (Weekday::Sun, "Sunday"),
];

const MONTHS: [(Month, &str); 12] = [
    (Month::January, "January"),
    (Month::February, "February"),
    (Month::March, "March"),
    (Month::April, "April"),
    (Month::May, "May"),
    (Month::June, "June"),
    (Month::July, "July"),
    (Month::August, "August"),
    (Month::September, "September"),
    (Month::October, "October"),
    (Month::November, "November"),
    (Month::December, "December"),
];

const NOON_SECS: u32 = 12 * 3600;
const FOUR_PM_SECS: u32 = 16 * 3600;

/// Part of the trading day a sale fell in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePeriod {
    /// 00:00:00 through 12:00:00 inclusive.
    Morning,
    /// After 12:00:00 through 16:00:00 inclusive.
    Afternoon,
    /// After 16:00:00.
    Evening,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 3] = [
        TimePeriod::Morning,
        TimePeriod::Afternoon,
        TimePeriod::Evening,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Morning => "Morning",
            TimePeriod::Afternoon => "Afternoon",
            TimePeriod::Evening => "Evening",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimePeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown time period: {}", s))
    }
}

/// Bucket a time of day.
///
/// Noon itself is still Morning, and anything after noon up to and including
/// 16:00:00 is Afternoon. That places the 12:00:01..12:01:00 minute in the
/// Afternoon bucket.
pub fn time_period(time: NaiveTime) -> TimePeriod {
    let at = (time.num_seconds_from_midnight(), time.nanosecond());

    if at <= (NOON_SECS, 0) {
        TimePeriod::Morning
    } else if at <= (FOUR_PM_SECS, 0) {
        TimePeriod::Afternoon
    } else {
        TimePeriod::Evening
    }
}

/// Full English weekday name.
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize].1
}

/// Full English month name.
pub fn month_name(month: Month) -> &'static str {
    MONTHS[month.number_from_month() as usize - 1].1
}

/// Parse a full English weekday name as written by [`weekday_name`].
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(day, _)| *day)
}

/// Parse a full English month name as written by [`month_name`].
pub fn parse_month(name: &str) -> Option<Month> {
    MONTHS
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(month, _)| *month)
}

/// Calendar quarter (1-4) of a date.
pub fn quarter(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

/// Compute the persisted derived attributes of a transaction.
///
/// Fails with a data error when the date or time is missing.
pub fn derive_attributes(record: &Transaction) -> Result<DerivedAttributes, RetailError> {
    let date = record
        .date
        .ok_or_else(|| RetailError::data(&record.invoice_id, "transaction_date is null"))?;
    let time = record
        .time
        .ok_or_else(|| RetailError::data(&record.invoice_id, "transaction_time is null"))?;

    let month = MONTHS[date.month0() as usize].0;

    Ok(DerivedAttributes {
        time_period: time_period(time),
        day_of_week: date.weekday(),
        month,
    })
}

/// Customer rating bucket used by the rating histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatingBin {
    ZeroToTwo,
    TwoToFour,
    FourToSix,
    SixToEight,
    EightToTen,
    Unknown,
}

impl RatingBin {
    pub fn label(&self) -> &'static str {
        match self {
            RatingBin::ZeroToTwo => "0-2",
            RatingBin::TwoToFour => "2-4",
            RatingBin::FourToSix => "4-6",
            RatingBin::SixToEight => "6-8",
            RatingBin::EightToTen => "8-10",
            RatingBin::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RatingBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The rating of a transaction, checked against the 0-10 scale.
pub fn checked_rating(record: &Transaction) -> Result<Option<Decimal>, RetailError> {
    match record.rating {
        Some(rating) if rating < Decimal::ZERO || rating > Decimal::TEN => Err(RetailError::data(
            &record.invoice_id,
            format!("rating {} is outside [0, 10]", rating),
        )),
        rating => Ok(rating),
    }
}

/// Bucket a transaction's rating.
///
/// Each bin is half-open on the right except the last, which includes 10.
pub fn rating_bin(record: &Transaction) -> Result<RatingBin, RetailError> {
    let Some(rating) = checked_rating(record)? else {
        return Ok(RatingBin::Unknown);
    };

    let bin = if rating < Decimal::TWO {
        RatingBin::ZeroToTwo
    } else if rating < Decimal::from(4) {
        RatingBin::TwoToFour
    } else if rating < Decimal::from(6) {
        RatingBin::FourToSix
    } else if rating < Decimal::from(8) {
        RatingBin::SixToEight
    } else {
        RatingBin::EightToTen
    };

    Ok(bin)
}
