//! Calendar parsing for appointment dates (`YYYY-MM-DD`) and slots (`HH:MM`).
//!
//! Schedules are wall-clock values in the institution's local time; there is
//! no timezone on the record. "Upcoming" is therefore judged against the
//! local clock of the process.

use crate::error::{CareError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| CareError::Validation(format!("invalid date '{date}': expected YYYY-MM-DD")))
}

pub fn parse_slot(slot: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(slot.trim(), "%H:%M")
        .map_err(|_| CareError::Validation(format!("invalid time slot '{slot}': expected HH:MM")))
}

/// Validate a date/slot pair supplied at the API boundary.
pub fn validate(date: &str, slot: &str) -> Result<()> {
    parse_date(date)?;
    parse_slot(slot)?;
    Ok(())
}

/// Combine a stored date and slot into a local date-time.
///
/// A malformed slot falls back to midnight of the date. Returns `None` when
/// the date itself cannot be read; such a record is never upcoming.
pub fn scheduled_at(date: &str, slot: &str) -> Option<NaiveDateTime> {
    let day = parse_date(date).ok()?;
    let time = lenient_slot(slot).unwrap_or_default();
    Some(day.and_time(time))
}

/// Accepts `HH:MM` and `HH:MM:SS`-style labels, reading only hour and minute.
fn lenient_slot(slot: &str) -> Option<NaiveTime> {
    let mut parts = slot.trim().split(':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn is_upcoming(date: &str, slot: &str, now: NaiveDateTime) -> bool {
    scheduled_at(date, slot).is_some_and(|at| at >= now)
}

pub fn weekday_of(date: &str) -> Result<Weekday> {
    Ok(parse_date(date)?.weekday())
}
