//! Calendar arithmetic shared by [`Instrument`](crate::instrument::Instrument),
//! [`Event`](crate::event::Event) and the strategy preliminaries.
//!
//! `Date`/`Time`/`DateTime` are thin aliases over `chrono` types rather than a
//! bespoke calendar (the original engine hand-rolled its own `DateTime`; we
//! don't need to since `chrono` already gives exact, tested arithmetic).

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub type Date = NaiveDate;
pub type Time = NaiveTime;
pub type DateTime = NaiveDateTime;

/// Weekday numbered Monday=1..Sunday=7, matching the original engine's
/// convention (confirmed from `original_source/src/datetime.cpp`: the
/// end-of-week exit switch treats weekday 5 as Friday).
pub fn weekday_number(d: Date) -> u32 {
    d.weekday().num_days_from_monday() + 1
}

pub fn is_friday(d: Date) -> bool {
    d.weekday() == Weekday::Fri
}

/// Calendar-day difference (a - b), inclusive of both pole, matching
/// `Date::DaysDiff` in the original: `rdn(a) - rdn(b)`.
pub fn days_diff(a: Date, b: Date) -> i64 {
    (a - b).num_days()
}

/// Minutes between two times of day, following the two-days-session
/// convention: if `close < open` the session wraps past midnight.
pub fn minutes_between(from: Time, to: Time) -> i64 {
    let from_secs = from.num_seconds_from_midnight() as i64;
    let to_secs = to.num_seconds_from_midnight() as i64;
    (to_secs - from_secs) / 60
}
