//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tf_core::{LogId, SessionStore, TaskId};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Local wall-clock formats accepted besides RFC 3339.
const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Parse a datetime string as ISO 8601, local wall-clock time, or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Local: "2026-01-15 10:30"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    parse_datetime_in(s, &Local, Utc::now())
}

/// [`parse_datetime`] against an explicit timezone and clock.
pub fn parse_datetime_in<Tz: TimeZone>(s: &str, tz: &Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // Try ISO 8601 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("{s} does not exist in the local timezone"));
        }
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), local time (e.g., '2026-01-15 10:30') or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    // Safe to create Duration now that we've validated the range
    let duration = Duration::minutes(n * minutes_per_unit);
    Ok(now - duration)
}

/// Years accepted on the command line.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse a calendar date (`YYYY-MM-DD`) between years 1 and 9999.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {s}. Use YYYY-MM-DD"))?;
    if !YEAR_RANGE.contains(&date.year()) {
        anyhow::bail!("Invalid date: {s}. Years must be between 1 and 9999");
    }
    Ok(date)
}

/// Resolves a task by exact ID, name (case-insensitive), or unique ID prefix.
pub fn resolve_task(store: &SessionStore, query: &str) -> Result<TaskId> {
    if let Some(task) = store.task(query) {
        return Ok(task.id.clone());
    }

    let mut by_name = store
        .tasks()
        .iter()
        .filter(|t| t.name.eq_ignore_ascii_case(query.trim()));
    match (by_name.next(), by_name.next()) {
        (Some(task), None) => return Ok(task.id.clone()),
        (Some(_), Some(_)) => {
            anyhow::bail!("Several tasks are named '{query}'. Use the task ID instead.")
        }
        (None, _) => {}
    }

    store
        .find_task(query)
        .map(|task| task.id.clone())
        .with_context(|| format!("No task matches '{query}'. Run 'tf task list' to see tasks."))
}

/// Resolves a log by exact ID or unique ID prefix.
pub fn resolve_log(store: &SessionStore, query: &str) -> Result<LogId> {
    if let Some(log) = store.log(query) {
        return Ok(log.id.clone());
    }
    let mut matches = store
        .logs()
        .iter()
        .filter(|l| l.id.as_str().starts_with(query));
    match (matches.next(), matches.next()) {
        (Some(log), None) => Ok(log.id.clone()),
        (Some(_), Some(_)) => anyhow::bail!("Log ID prefix '{query}' is ambiguous"),
        (None, _) => anyhow::bail!("No log matches '{query}'. Run 'tf log list' to see logs."),
    }
}

/// Local time of day for display, e.g. "09:30".
pub fn local_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M").to_string()
}

/// Local date and time for display, e.g. "2025-01-29 09:30".
pub fn local_datetime(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tf_core::{TaskDraft, TrackerState};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime_in("2025-01-29T09:30:00+09:00", &Utc, now()).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 29, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_local_wall_clock() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let dt = parse_datetime_in("2025-01-29 09:30", &tz, now()).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 29, 0, 30, 0).unwrap());
        let dt = parse_datetime_in("2025-01-29T09:30", &Utc, now()).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 29, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            parse_datetime_in("2 hours ago", &Utc, now()).unwrap(),
            now() - Duration::hours(2)
        );
        assert_eq!(
            parse_datetime_in("1 minute ago", &Utc, now()).unwrap(),
            now() - Duration::minutes(1)
        );
        assert_eq!(
            parse_datetime_in("3 weeks ago", &Utc, now()).unwrap(),
            now() - Duration::weeks(3)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_datetime_in("yesterday-ish", &Utc, now()).is_err());
        assert!(parse_datetime_in("999999999999 weeks ago", &Utc, now()).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-02-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert!(parse_date("02/01/2025").is_err());
        assert!(parse_date("+262142-12-31").is_err());
        assert!(parse_date("0000-01-01").is_err());
    }

    #[test]
    fn test_resolve_task_by_prefix_or_name() {
        let mut store = SessionStore::from_state(TrackerState::default());
        let id = store
            .create_task(TaskDraft::named("Write Docs"), now())
            .unwrap()
            .id
            .clone();
        store.create_task(TaskDraft::named("Review"), now()).unwrap();

        assert_eq!(resolve_task(&store, id.as_str()).unwrap(), id);
        assert_eq!(resolve_task(&store, id.short(12)).unwrap(), id);
        assert_eq!(resolve_task(&store, "write docs").unwrap(), id);
        assert!(resolve_task(&store, "nothing").is_err());
    }

    #[test]
    fn test_resolve_task_rejects_duplicate_names() {
        let mut store = SessionStore::default();
        store.create_task(TaskDraft::named("Same"), now()).unwrap();
        store.create_task(TaskDraft::named("Same"), now()).unwrap();
        let err = resolve_task(&store, "Same").unwrap_err();
        assert!(err.to_string().contains("Several tasks"));
    }
}
