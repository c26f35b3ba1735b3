//! Status command: timers plus today/week/month totals.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use tf_core::time::{format_clock, format_duration, local_date};
use tf_core::{Period, SessionStore, SummaryQuery, compute_summary};

/// Width of the task name column.
const NAME_WIDTH: usize = 24;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    store: &SessionStore,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()> {
    write!(writer, "{}", format_timers(store, now))?;
    writeln!(writer)?;
    write!(writer, "{}", format_totals(store, now, tz))?;
    Ok(())
}

/// Running and paused timers, one per line with their clocks.
pub fn format_timers(store: &SessionStore, now: DateTime<Utc>) -> String {
    let running: Vec<_> = store
        .active_sessions()
        .iter()
        .map(|a| (&a.task_id, a.total_ms(now)))
        .collect();
    let paused: Vec<_> = store.paused_sessions().collect();

    if running.is_empty() && paused.is_empty() {
        return "No timers running.\n".to_string();
    }

    let mut out = String::new();
    for (title, timers) in [("RUNNING", running), ("PAUSED", paused)] {
        if timers.is_empty() {
            continue;
        }
        out.push_str(title);
        out.push('\n');
        for (task_id, ms) in timers {
            let name = store
                .task(task_id.as_str())
                .map_or(task_id.as_str(), |t| t.name.as_str());
            out.push_str(&format!(
                "  {}  {name:<NAME_WIDTH$}  {:>8}\n",
                task_id.short(8),
                format_clock(ms)
            ));
        }
    }
    out
}

/// With-overlap totals for the current day, week and month.
pub fn format_totals<Tz: TimeZone>(store: &SessionStore, now: DateTime<Utc>, tz: &Tz) -> String {
    let today = local_date(now, tz);
    let mut out = String::new();
    for (label, period) in [
        ("Today", Period::Day),
        ("This week", Period::Week),
        ("This month", Period::Month),
    ] {
        let query = SummaryQuery {
            period,
            anchor: today,
            exclude_archived: false,
        };
        let summary = compute_summary(store, &query, now, tz);
        out.push_str(&format!(
            "{label:<12}{}\n",
            format_duration(summary.total_with_overlap)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use insta::assert_snapshot;
    use tf_core::{LogDraft, TaskDraft, Tracker, TrackerState};

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_status_without_timers() {
        let store = SessionStore::default();
        let mut out = Vec::new();
        run(&mut out, &store, at(1, 29, 12), &Utc).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
No timers running.

Today       0m
This week   0m
This month  0m
");
    }

    #[test]
    fn test_status_with_timers_and_totals() {
        let mut tracker = Tracker::new(TrackerState::default());
        let write = tracker
            .create_task(TaskDraft::named("Write"), at(1, 1, 0))
            .unwrap()
            .id
            .clone();
        let review = tracker
            .create_task(TaskDraft::named("Review"), at(1, 1, 0))
            .unwrap()
            .id
            .clone();
        // Earlier in the month, outside the week
        tracker
            .create_log(LogDraft {
                task_id: review.clone(),
                start_at: at(1, 6, 9),
                end_at: at(1, 6, 11),
                note: None,
            })
            .unwrap();
        let now = at(1, 29, 12);
        tracker.start_timer(&write, now - Duration::minutes(90)).unwrap();
        tracker.start_timer(&review, now - Duration::minutes(30)).unwrap();
        tracker.pause_timer(&review, now - Duration::minutes(10)).unwrap();

        let timers = format_timers(tracker.store(), now);
        let lines: Vec<&str> = timers.lines().collect();
        assert_eq!(lines[0], "RUNNING");
        assert!(lines[1].contains("Write") && lines[1].ends_with("1:30:00"));
        assert_eq!(lines[2], "PAUSED");
        assert!(lines[3].contains("Review") && lines[3].ends_with("0:20:00"));

        // Running 1h30m plus paused 20m, plus 2h earlier in the month
        assert_snapshot!(format_totals(tracker.store(), now, &Utc), @r"
Today       1h 50m
This week   1h 50m
This month  3h 50m
");
    }
}
