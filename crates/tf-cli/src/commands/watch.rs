//! Watch command: live clocks while any timer runs.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use tf_core::time::{format_clock, format_duration, local_date};
use tf_core::{Period, SessionStore, SummaryQuery, Tick, TickSchedule, compute_summary, timer};
use tf_db::{StateFile, load_or_default};

/// Redraws running clocks every tick and the day's total every few ticks.
///
/// The document is re-read each tick so changes made by other `tf`
/// invocations show up. Returns the number of ticks drawn; the loop ends
/// when no timer is running or after `max_ticks`.
pub fn run_loop<W, Tz>(
    writer: &mut W,
    file: &StateFile,
    tz: &Tz,
    max_ticks: Option<u32>,
    mut now: impl FnMut() -> DateTime<Utc>,
    mut sleep: impl FnMut(),
) -> Result<u32>
where
    W: Write,
    Tz: TimeZone,
{
    let mut schedule = TickSchedule::default();
    let mut ticks = 0;

    loop {
        let store = SessionStore::from_state(load_or_default(file));
        if !timer::is_ticking(&store) {
            writeln!(writer, "No timers running.")?;
            return Ok(ticks);
        }

        let instant = now();
        let refresh = schedule.tick() == Tick::DisplayAndRefresh || ticks == 0;
        writeln!(writer, "{}", format_tick(&store, instant, tz, refresh))?;
        writer.flush()?;
        ticks += 1;

        if max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(ticks);
        }
        sleep();
    }
}

/// One status line: local time, each running clock and optionally today's total.
pub fn format_tick<Tz: TimeZone>(
    store: &SessionStore,
    now: DateTime<Utc>,
    tz: &Tz,
    with_total: bool,
) -> String {
    let clocks: Vec<String> = store
        .active_sessions()
        .iter()
        .map(|a| {
            let name = store
                .task(a.task_id.as_str())
                .map_or(a.task_id.as_str(), |t| t.name.as_str());
            format!("{name} {}", format_clock(a.total_ms(now)))
        })
        .collect();

    let mut line = format!(
        "[{}] {}",
        now.with_timezone(tz).naive_local().format("%H:%M:%S"),
        clocks.join(" | ")
    );
    if with_total {
        let query = SummaryQuery {
            period: Period::Day,
            anchor: local_date(now, tz),
            exclude_archived: false,
        };
        let summary = compute_summary(store, &query, now, tz);
        line.push_str(&format!(
            " (today {})",
            format_duration(summary.total_with_overlap)
        ));
    }
    line
}

pub fn run<W: Write>(writer: &mut W, file: &StateFile, interval_ms: u64, max_ticks: Option<u32>) -> Result<u32> {
    let interval = Duration::from_millis(interval_ms.max(1));
    run_loop(writer, file, &Local, max_ticks, Utc::now, || {
        std::thread::sleep(interval);
    })
}
