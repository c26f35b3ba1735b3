//! Time-accounting engine for the `TimeFlow` tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Timers: per-task start/pause/finish/cancel with concurrency admission
//! - Summaries: per-task totals, overlap-inclusive and deduplicated totals
//! - Charts: per-day (or per-month) buckets for a period
//! - Reconciliation: merging a local document with a remote copy
//!
//! Everything is synchronous and takes `now` and the timezone as arguments.

pub mod chart;
pub mod merge;
pub mod model;
pub mod period;
pub mod store;
pub mod summary;
pub mod tick;
pub mod time;
pub mod timer;
pub mod tracker;
pub mod types;

pub use chart::{ChartSeries, TaskSeries, build_chart_series};
pub use merge::{merge, merge_with};
pub use model::{ActiveSession, LogDraft, LogEntry, Settings, Task, TaskDraft, TrackerState};
pub use period::{DateSpan, Period, TimeRange};
pub use store::{LogFilter, SessionStore, StoreError};
pub use summary::{Segment, SegmentKind, Summary, SummaryQuery, TaskTotal, compute_summary};
pub use tick::{Tick, TickSchedule};
pub use timer::{TimerEvent, TimerRejection, TimerState};
pub use tracker::{MostRecentFirst, OrderingPolicy, Tracker, Unordered};
pub use types::{ConcurrencyMode, LogId, TaskId, ValidationError, WeekStart};
