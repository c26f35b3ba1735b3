//! Period summaries.
//!
//! A summary clips every log and live timer of the visible tasks to the
//! requested period, splits them at local midnights, and reports two totals:
//!
//! - **with overlap**: sum of per-task durations, so concurrent work counts
//!   once per task;
//! - **actual**: length of the union of all segments, so concurrent work
//!   counts once.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::period::{Period, TimeRange};
use crate::store::SessionStore;
use crate::time::{local_date, ms_before, next_local_midnight};
use crate::types::TaskId;

/// What to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryQuery {
    pub period: Period,
    /// Reference date the period is resolved around.
    pub anchor: NaiveDate,
    pub exclude_archived: bool,
}

/// Origin of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Logged,
    Paused,
    Running,
}

impl SegmentKind {
    /// Whether the segment comes from a timer that is still open.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Paused | Self::Running)
    }
}

/// A piece of tracked time within one local day, clipped to the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub task_id: TaskId,
    /// Local calendar day the segment falls in.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Time spent on one task within the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTotal {
    pub task_id: TaskId,
    pub name: String,
    pub color: String,
    pub duration_ms: i64,
}

impl TaskTotal {
    /// Percentage of `total_ms` this task accounts for (0 when the total is 0).
    #[allow(clippy::cast_precision_loss)]
    pub fn share_of_total(&self, total_ms: i64) -> f64 {
        if total_ms <= 0 {
            return 0.0;
        }
        self.duration_ms as f64 / total_ms as f64 * 100.0
    }
}

/// Aggregated view of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub period: Period,
    pub range: TimeRange,
    pub segments: Vec<Segment>,
    /// Every visible task in display order, including zero totals.
    pub by_task: Vec<TaskTotal>,
    pub total_with_overlap: i64,
    pub total_actual: i64,
}

impl Summary {
    /// Tasks with tracked time, largest first. Ties keep display order.
    pub fn ranked(&self) -> Vec<&TaskTotal> {
        let mut ranked: Vec<&TaskTotal> =
            self.by_task.iter().filter(|t| t.duration_ms > 0).collect();
        ranked.sort_by_key(|t| std::cmp::Reverse(t.duration_ms));
        ranked
    }

    pub fn duration_for(&self, task_id: &TaskId) -> i64 {
        self.by_task
            .iter()
            .find(|t| &t.task_id == task_id)
            .map_or(0, |t| t.duration_ms)
    }

    /// Time the with-overlap total counts more than once.
    pub const fn overlap_ms(&self) -> i64 {
        self.total_with_overlap - self.total_actual
    }
}

/// Summarizes the store over a period, in the caller's timezone.
///
/// Paused and running timers contribute live segments ending at `now`.
/// The result depends only on the arguments.
pub fn compute_summary<Tz: TimeZone>(
    store: &SessionStore,
    query: &SummaryQuery,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Summary {
    let today = local_date(now, tz);
    let range = query
        .period
        .range(query.anchor, today, store.settings().week_starts_on, tz);

    let visible: Vec<_> = store
        .tasks()
        .iter()
        .filter(|t| !(query.exclude_archived && t.archived))
        .collect();
    let visible_ids: HashSet<&TaskId> = visible.iter().map(|t| &t.id).collect();

    let mut segments = Vec::new();
    let mut push = |task_id: &TaskId, start: DateTime<Utc>, end: DateTime<Utc>, kind: SegmentKind| {
        if !range.intersects(start, end) {
            return;
        }
        segments.extend(
            split_by_day(start, end, tz)
                .into_iter()
                .filter_map(|(date, s, e)| clip(&range, s, e).map(|(s, e)| (date, s, e)))
                .map(|(date, start, end)| Segment {
                    task_id: task_id.clone(),
                    date,
                    start,
                    end,
                    kind,
                }),
        );
    };

    for log in store.logs() {
        if visible_ids.contains(&log.task_id) {
            push(&log.task_id, log.start_at, log.end_at, SegmentKind::Logged);
        }
    }
    for (task_id, ms) in store.paused_sessions() {
        if visible_ids.contains(task_id) {
            let start = ms_before(now, ms);
            push(task_id, start, now, SegmentKind::Paused);
        }
    }
    for active in store.active_sessions() {
        if visible_ids.contains(&active.task_id) {
            let start = ms_before(now, active.total_ms(now));
            push(&active.task_id, start, now, SegmentKind::Running);
        }
    }

    let by_task: Vec<TaskTotal> = visible
        .iter()
        .map(|task| TaskTotal {
            task_id: task.id.clone(),
            name: task.name.clone(),
            color: task.color.clone(),
            duration_ms: segments
                .iter()
                .filter(|s| s.task_id == task.id)
                .map(Segment::duration_ms)
                .sum(),
        })
        .collect();
    let total_with_overlap = by_task.iter().map(|t| t.duration_ms).sum();
    let total_actual = actual_working_ms(&segments);

    Summary {
        period: query.period,
        range,
        segments,
        by_task,
        total_with_overlap,
        total_actual,
    }
}

/// Splits `[start, end)` at local midnights into `(date, start, end)` pieces.
pub fn split_by_day<Tz: TimeZone>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: &Tz,
) -> Vec<(NaiveDate, DateTime<Utc>, DateTime<Utc>)> {
    let mut pieces = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let midnight = next_local_midnight(cursor, tz);
        if midnight <= cursor {
            // Guards against a timezone that maps two days to one instant
            pieces.push((local_date(cursor, tz), cursor, end));
            break;
        }
        let piece_end = midnight.min(end);
        pieces.push((local_date(cursor, tz), cursor, piece_end));
        cursor = piece_end;
    }
    pieces
}

fn clip(
    range: &TimeRange,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = start.max(range.start);
    let end = end.min(range.end);
    (end > start).then_some((start, end))
}

/// Length of the union of all segments, in milliseconds.
fn actual_working_ms(segments: &[Segment]) -> i64 {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = segments
        .iter()
        .filter(|s| s.end > s.start)
        .map(|s| (s.start, s.end))
        .collect();
    if intervals.is_empty() {
        return 0;
    }
    intervals.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
        .iter()
        .map(|(start, end)| (*end - *start).num_milliseconds())
        .sum()
}
