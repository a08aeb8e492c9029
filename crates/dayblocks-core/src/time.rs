//! Minute-of-day arithmetic and HH:MM formatting.
//!
//! Every clock time in the planner is a plain `i32` count of minutes since
//! local midnight. Block lengths use the same unit.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::ValidationError;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: i32 = 1440;

/// Last valid minute-of-day (23:59).
pub const LAST_MINUTE: i32 = MINUTES_PER_DAY - 1;

/// Longest block or sub-item, in minutes. A block may run past midnight but
/// never for more than a day.
pub const MAX_DURATION_MINUTES: i32 = MINUTES_PER_DAY;

/// Parse an `HH:MM` string into minutes since midnight.
///
/// Hours may be one or two digits; minutes must be two digits.
pub fn parse_hhmm(s: &str) -> Result<i32, ValidationError> {
    let malformed = || ValidationError::MalformedTime(s.to_string());

    let (hours, minutes) = s.trim().split_once(':').ok_or_else(malformed)?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(malformed());
    }

    let hours: i32 = hours.parse().map_err(|_| malformed())?;
    let minutes: i32 = minutes.parse().map_err(|_| malformed())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(malformed());
    }

    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as `HH:MM`.
///
/// Values past midnight wrap onto the next day's clock face, so a block
/// ending at 1470 prints as `00:30`.
pub fn format_hhmm(minute_of_day: i32) -> String {
    let m = minute_of_day.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Format `start`-`start + duration` as `HH:MM-HH:MM`.
pub fn format_range(start: i32, duration: i32) -> String {
    format!("{}-{}", format_hhmm(start), format_hhmm(start + duration))
}

/// Human-readable duration: `45m`, `2h`, `1h 30m`.
pub fn format_duration(minutes: i32) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{sign}{m}m"),
        (h, 0) => format!("{sign}{h}h"),
        (h, m) => format!("{sign}{h}h {m}m"),
    }
}

/// Whether `minute_of_day` is a valid clock time on a single day.
pub fn is_within_day(minute_of_day: i32) -> bool {
    (0..MINUTES_PER_DAY).contains(&minute_of_day)
}

/// Clamp a minute-of-day into `[0, 1439]`.
pub fn clamp_to_day(minute_of_day: i32) -> i32 {
    minute_of_day.clamp(0, LAST_MINUTE)
}

/// Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First date on or after `from` that falls on `weekday`.
pub fn next_on_or_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let offset = (weekday.num_days_from_monday() + 7 - from.weekday().num_days_from_monday()) % 7;
    from + chrono::Duration::days(i64::from(offset))
}
