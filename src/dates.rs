//! Civil-date arithmetic at day granularity.
//!
//! Every date in the pipeline is a calendar date with no time-of-day or
//! zone component, so arithmetic here is stable across daylight-saving
//! boundaries by construction.

use chrono::{Datelike, Duration, NaiveDate};

/// Parse a `YYYY-MM-DD` string into a civil date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

/// Shift a date by a (possibly negative) number of days.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Number of days between two dates, always non-negative.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

/// Day index of a date on a common linear scale.
///
/// Used for centroid and variance arithmetic where dates are treated
/// as points on a number line.
pub fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Enumerate the inclusive range of dates from `start` to `end`.
///
/// Returns an empty vector when `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut dates = Vec::with_capacity((end - start).num_days() as usize + 1);
    let mut current = start;
    while current <= end {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}
