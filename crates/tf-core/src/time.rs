//! Date and duration arithmetic.
//!
//! Everything that depends on a wall clock takes the timezone as a parameter,
//! so callers pass `chrono::Local` while tests pin a fixed offset.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::types::WeekStart;

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // DST spring-forward gap at midnight is rare but possible; 1am always exists
        .or_else(|| {
            midnight
                .checked_add_signed(Duration::hours(1))
                .and_then(|one_am| tz.from_local_datetime(&one_am).earliest())
        })
        .map_or_else(
            || Utc.from_utc_datetime(&midnight),
            |dt| dt.with_timezone(&Utc),
        )
}

/// Returns the local calendar date of an instant.
pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Returns the first instant of the local day after the one containing `instant`.
///
/// Saturates at the latest representable instant.
pub fn next_local_midnight<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    day_after_midnight(local_date(instant, tz), tz)
}

/// Returns the UTC instant at which the local day after `date` begins.
///
/// Saturates at the latest representable instant.
pub fn day_after_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    date.succ_opt()
        .map_or(DateTime::<Utc>::MAX_UTC, |tomorrow| local_midnight_to_utc(tomorrow, tz))
}

/// The instant `ms` milliseconds before `now`, saturating at the earliest instant.
pub fn ms_before(now: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
    Duration::try_milliseconds(ms)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Local date key (`YYYY-MM-DD`) of an instant.
pub fn date_key<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> String {
    local_date(instant, tz).format("%Y-%m-%d").to_string()
}

/// Returns the first day of the week containing `date`.
pub fn week_start(date: NaiveDate, start: WeekStart) -> NaiveDate {
    let offset = match start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MIN)
}

/// Returns the first day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Returns the last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    add_months(month_start(date), 1).pred_opt().unwrap_or(date)
}

/// Number of days in the month containing `date` (28–31).
pub fn days_in_month(date: NaiveDate) -> u32 {
    month_end(date).day()
}

/// Shifts a date by whole months, clamping the day to the target month's length.
///
/// Jan 31 + 1 month is Feb 28 (or 29).
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Milliseconds between two instants, saturating at zero.
pub fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().max(0)
}

// ========== Duration Formatting ==========

/// Formats milliseconds as a running clock, `H:MM:SS`.
/// Negative durations are treated as zero.
pub fn format_clock(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
