//! ISO week arithmetic.

use chrono::{Datelike, Duration, NaiveDate};

/// Snaps a date to the Monday of its ISO week.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Enumerates `count` consecutive Mondays starting at the Monday of
/// `start`'s ISO week.
pub fn mondays_from(start: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let first = monday_of(start);
    (0..count)
        .map(|i| first + Duration::weeks(i as i64))
        .collect()
}
