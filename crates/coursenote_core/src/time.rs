//! Wall-clock normalization and reminder delay computation.
//!
//! # Responsibility
//! - Turn user-entered calendar date + wall-clock time into one absolute
//!   instant.
//! - Compute the delay handed to the notifier for one-time and daily fires.
//! - Project instants back to calendar days for query filters.
//!
//! # Invariants
//! - The fixed reference frame is UTC. The process timezone is never read.
//! - This module is the only legal path from user input to a persisted
//!   timestamp.
//! - Delays are whole seconds, rounded up, and never below 1.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

pub type TimeResult<T> = Result<T, TimeError>;

/// Normalization and scheduling failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Malformed calendar or wall-clock input. `field` names the input.
    InvalidDateComponents { field: &'static str, value: String },
    /// One-time target is not strictly after `now`.
    InvalidSchedule {
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

impl Display for TimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDateComponents { field, value } => {
                write!(f, "invalid {field}: `{value}`")
            }
            Self::InvalidSchedule { target, now } => write!(
                f,
                "reminder time {} is not in the future (now {})",
                target.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
        }
    }
}

impl Error for TimeError {}

/// Hour and minute of a wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub hour: u32,
    pub minute: u32,
}

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Maps five wall-clock integers to an absolute UTC instant.
///
/// The same inputs always yield the same instant, independent of the
/// timezone or daylight-saving state of the calling process.
///
/// # Errors
/// - `InvalidDateComponents` naming `month`, `day`, `hour` or `minute`.
pub fn to_canonical_instant(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> TimeResult<DateTime<Utc>> {
    if !(1..=12).contains(&month) {
        return Err(invalid("month", month));
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid("day", format!("{year:04}-{month:02}-{day:02}")))?;
    let time = wall_time(hour, minute)?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Seconds from `now` until the next UTC `hour:minute`.
///
/// When today's occurrence is at or before `now`, tomorrow's is used, so the
/// result is always in `1..=86400`.
pub fn seconds_until_next_daily(hour: u32, minute: u32, now: DateTime<Utc>) -> TimeResult<u64> {
    let time = wall_time(hour, minute)?;
    let mut target = Utc.from_utc_datetime(&now.date_naive().and_time(time));
    if target <= now {
        target += Duration::seconds(SECONDS_PER_DAY);
    }
    Ok(ceil_seconds(target - now).max(1))
}

/// Seconds from `now` until `target`, rounded up, at least 1.
///
/// # Errors
/// - `InvalidSchedule` when `target <= now`.
pub fn seconds_until_instant(target: DateTime<Utc>, now: DateTime<Utc>) -> TimeResult<u64> {
    if target <= now {
        return Err(TimeError::InvalidSchedule { target, now });
    }
    Ok(ceil_seconds(target - now).max(1))
}

/// Parses a strict `YYYY-MM-DD` calendar date; `field` names the input in
/// errors.
pub fn parse_calendar_date(field: &'static str, value: &str) -> TimeResult<NaiveDate> {
    let trimmed = value.trim();
    let parts = trimmed.split('-').collect::<Vec<_>>();
    let [year, month, day] = parts.as_slice() else {
        return Err(invalid(field, trimmed));
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return Err(invalid(field, trimmed));
    }
    let year = parse_digits(year).ok_or_else(|| invalid(field, trimmed))?;
    let month = parse_digits(month).ok_or_else(|| invalid(field, trimmed))?;
    let day = parse_digits(day).ok_or_else(|| invalid(field, trimmed))?;
    let year = i32::try_from(year).map_err(|_| invalid(field, trimmed))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid(field, trimmed))
}

/// Parses `HH:MM` (or `HH:MM:00`) into a wall-clock time.
pub fn parse_wall_clock(field: &'static str, value: &str) -> TimeResult<WallClock> {
    let trimmed = value.trim();
    let parts = trimmed.split(':').collect::<Vec<_>>();
    let (hour, minute) = match parts.as_slice() {
        [hour, minute] => (hour, minute),
        [hour, minute, "00"] => (hour, minute),
        _ => return Err(invalid(field, trimmed)),
    };
    if hour.len() != 2 || minute.len() != 2 {
        return Err(invalid(field, trimmed));
    }
    let hour = parse_digits(hour).ok_or_else(|| invalid(field, trimmed))?;
    let minute = parse_digits(minute).ok_or_else(|| invalid(field, trimmed))?;
    if hour > 23 || minute > 59 {
        return Err(invalid(field, trimmed));
    }
    Ok(WallClock { hour, minute })
}

/// Derives the canonical instant from wire-form `localDate` + `localTime`.
pub fn canonical_from_local(local_date: &str, local_time: &str) -> TimeResult<DateTime<Utc>> {
    let date = parse_calendar_date("localDate", local_date)?;
    let clock = parse_wall_clock("localTime", local_time)?;
    to_canonical_instant(
        date.year(),
        date.month(),
        date.day(),
        clock.hour,
        clock.minute,
    )
}

/// Half-open `[start, end)` bounds of a calendar day in the reference frame.
pub fn calendar_day_bounds(day: NaiveDate) -> TimeResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = to_canonical_instant(day.year(), day.month(), day.day(), 0, 0)?;
    Ok((start, start + Duration::seconds(SECONDS_PER_DAY)))
}

/// Converts an instant to the epoch-millisecond storage form.
pub fn to_epoch_ms(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

/// Converts stored epoch milliseconds back to an instant.
pub fn from_epoch_ms(epoch_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(epoch_ms).single()
}

fn wall_time(hour: u32, minute: u32) -> TimeResult<NaiveTime> {
    if hour > 23 {
        return Err(invalid("hour", hour));
    }
    if minute > 59 {
        return Err(invalid("minute", minute));
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| invalid("hour", format!("{hour:02}:{minute:02}")))
}

fn ceil_seconds(delta: Duration) -> u64 {
    let whole = delta.num_seconds();
    let fraction = delta - Duration::seconds(whole);
    let rounded = if fraction > Duration::zero() {
        whole + 1
    } else {
        whole
    };
    u64::try_from(rounded).unwrap_or(0)
}

fn parse_digits(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn invalid(field: &'static str, value: impl ToString) -> TimeError {
    TimeError::InvalidDateComponents {
        field,
        value: value.to_string(),
    }
}
