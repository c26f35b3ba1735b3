//! Per-task timer state machine.
//!
//! ```text
//! Idle ──start──▶ Running ──pause──▶ Paused
//!  ▲               │  ▲                │
//!  │               │  └─────start──────┘
//!  └──finish/cancel┘       finish ──▶ Idle
//! ```
//!
//! Transitions validate their preconditions first and leave the store
//! untouched when rejected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::LogEntry;
use crate::store::SessionStore;
use crate::time::ms_before;
use crate::types::{ConcurrencyMode, LogId, TaskId};

/// Where a task sits in its timer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl TimerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Started {
        task_id: TaskId,
        /// Time carried over from a previous pause.
        resumed_ms: i64,
        /// Tasks paused to make room (single mode), with their accumulated time.
        auto_paused: Vec<(TaskId, i64)>,
        /// The display tick switched on.
        ticking_started: bool,
    },
    Paused {
        task_id: TaskId,
        accumulated_ms: i64,
        ticking_stopped: bool,
    },
    Finished {
        task_id: TaskId,
        total_ms: i64,
        /// `None` when no time had accrued.
        log: Option<LogEntry>,
        archived: bool,
        ticking_stopped: bool,
    },
    Cancelled {
        task_id: TaskId,
        discarded_ms: i64,
        ticking_stopped: bool,
    },
}

impl TimerEvent {
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Started { task_id, .. }
            | Self::Paused { task_id, .. }
            | Self::Finished { task_id, .. }
            | Self::Cancelled { task_id, .. } => task_id,
        }
    }
}

/// Why a transition was refused. The store is unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerRejection {
    #[error("task {0} is already running")]
    AlreadyRunning(TaskId),

    #[error("cannot run more than {max} timers at once; stop one first")]
    CapacityReached { max: u32 },

    #[error("task {0} is not running")]
    NotRunning(TaskId),

    #[error("task {0} has no running or paused timer")]
    NotActive(TaskId),

    #[error("no task with ID {0}")]
    UnknownTask(TaskId),
}

/// Current timer state of a task.
pub fn timer_state(store: &SessionStore, task_id: &TaskId) -> TimerState {
    if store.active_session(task_id).is_some() {
        TimerState::Running
    } else if store.paused_ms(task_id).is_some() {
        TimerState::Paused
    } else {
        TimerState::Idle
    }
}

/// Whether the display tick should run.
pub fn is_ticking(store: &SessionStore) -> bool {
    !store.active_sessions().is_empty()
}

/// Starts or resumes a task's timer, applying concurrency admission.
pub fn start(
    store: &mut SessionStore,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<TimerEvent, TimerRejection> {
    if store.task(task_id.as_str()).is_none() {
        return Err(TimerRejection::UnknownTask(task_id.clone()));
    }
    if store.active_session(task_id).is_some() {
        return Err(TimerRejection::AlreadyRunning(task_id.clone()));
    }

    let mode = store.settings().concurrency_mode;
    let max = store.settings().max_concurrent;
    let mut auto_paused = Vec::new();
    match mode {
        ConcurrencyMode::Single => {
            let running: Vec<TaskId> = store
                .active_sessions()
                .iter()
                .map(|a| a.task_id.clone())
                .collect();
            for other in running {
                if let Some(ms) = suspend(store, &other, now) {
                    auto_paused.push((other, ms));
                }
            }
        }
        ConcurrencyMode::Multi => {
            if store.active_sessions().len() >= max as usize {
                return Err(TimerRejection::CapacityReached { max });
            }
        }
    }

    let ticking_started = store.active_sessions().is_empty();
    let resumed_ms = store.begin_run(task_id, now).accumulated_ms;
    tracing::debug!(%task_id, resumed_ms, auto_paused = auto_paused.len(), "timer started");

    Ok(TimerEvent::Started {
        task_id: task_id.clone(),
        resumed_ms,
        auto_paused,
        ticking_started,
    })
}

/// Pauses a running timer, keeping its accumulated time.
pub fn pause(
    store: &mut SessionStore,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<TimerEvent, TimerRejection> {
    let accumulated_ms =
        suspend(store, task_id, now).ok_or_else(|| TimerRejection::NotRunning(task_id.clone()))?;
    tracing::debug!(%task_id, accumulated_ms, "timer paused");

    Ok(TimerEvent::Paused {
        task_id: task_id.clone(),
        accumulated_ms,
        ticking_stopped: !is_ticking(store),
    })
}

/// Pauses a running timer, otherwise starts it.
pub fn toggle(
    store: &mut SessionStore,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<TimerEvent, TimerRejection> {
    if store.active_session(task_id).is_some() {
        pause(store, task_id, now)
    } else {
        start(store, task_id, now)
    }
}

/// Finalizes a running or paused timer into a log ending at `now`.
///
/// The log's start is back-dated by the total tracked time, so pauses
/// do not widen it. The task is archived when the settings ask for it.
pub fn finish(
    store: &mut SessionStore,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<TimerEvent, TimerRejection> {
    let was_ticking = is_ticking(store);
    let total_ms = if let Some(active) = store.take_active(task_id) {
        store.take_paused(task_id);
        active.total_ms(now)
    } else if let Some(ms) = store.take_paused(task_id) {
        ms
    } else {
        return Err(TimerRejection::NotActive(task_id.clone()));
    };

    let log = (total_ms > 0).then(|| LogEntry {
        id: LogId::generate(),
        task_id: task_id.clone(),
        start_at: ms_before(now, total_ms),
        end_at: now,
        note: None,
    });
    if let Some(log) = &log {
        store.push_log(log.clone());
    }

    let archived = store.settings().archive_on_finish;
    if archived {
        store.mark_archived(task_id, now);
    }
    tracing::debug!(%task_id, total_ms, archived, "timer finished");

    Ok(TimerEvent::Finished {
        task_id: task_id.clone(),
        total_ms,
        log,
        archived,
        ticking_stopped: was_ticking && !is_ticking(store),
    })
}

/// Discards a running timer without recording anything.
pub fn cancel(
    store: &mut SessionStore,
    task_id: &TaskId,
    now: DateTime<Utc>,
) -> Result<TimerEvent, TimerRejection> {
    let active = store
        .take_active(task_id)
        .ok_or_else(|| TimerRejection::NotRunning(task_id.clone()))?;
    let discarded_ms = active.total_ms(now);
    tracing::debug!(%task_id, discarded_ms, "timer cancelled");

    Ok(TimerEvent::Cancelled {
        task_id: task_id.clone(),
        discarded_ms,
        ticking_stopped: !is_ticking(store),
    })
}

/// Moves a running timer into the paused map. Returns the accumulated time.
fn suspend(store: &mut SessionStore, task_id: &TaskId, now: DateTime<Utc>) -> Option<i64> {
    let active = store.take_active(task_id)?;
    let ms = active.total_ms(now);
    store.set_paused(task_id, ms);
    Some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Settings, TaskDraft};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, 9, 0, 0).unwrap()
    }

    fn mins(n: i64) -> DateTime<Utc> {
        t0() + Duration::minutes(n)
    }

    fn setup(settings: Settings, count: usize) -> (SessionStore, Vec<TaskId>) {
        let mut store = SessionStore::default();
        store.update_settings(settings).unwrap();
        let ids = (0..count)
            .map(|i| {
                store
                    .create_task(TaskDraft::named(format!("Task {i}")), t0())
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        (store, ids)
    }

    fn multi(max: u32) -> Settings {
        Settings {
            max_concurrent: max,
            ..Settings::default()
        }
    }

    #[test]
    fn start_then_start_again_is_rejected() {
        let (mut store, ids) = setup(Settings::default(), 1);
        let event = start(&mut store, &ids[0], t0()).unwrap();
        assert!(matches!(
            event,
            TimerEvent::Started { ticking_started: true, resumed_ms: 0, .. }
        ));

        let before = store.clone();
        assert_eq!(
            start(&mut store, &ids[0], mins(1)),
            Err(TimerRejection::AlreadyRunning(ids[0].clone()))
        );
        assert_eq!(store, before);
    }

    #[test]
    fn start_unknown_task_is_rejected() {
        let (mut store, _) = setup(Settings::default(), 0);
        let ghost = TaskId::new("ghost").unwrap();
        assert_eq!(
            start(&mut store, &ghost, t0()),
            Err(TimerRejection::UnknownTask(ghost))
        );
        assert!(!is_ticking(&store));
    }

    #[test]
    fn pause_and_resume_accumulate() {
        let (mut store, ids) = setup(Settings::default(), 1);
        let id = &ids[0];

        start(&mut store, id, t0()).unwrap();
        let paused = pause(&mut store, id, mins(10)).unwrap();
        assert_eq!(
            paused,
            TimerEvent::Paused {
                task_id: id.clone(),
                accumulated_ms: 600_000,
                ticking_stopped: true
            }
        );
        assert_eq!(timer_state(&store, id), TimerState::Paused);

        let resumed = start(&mut store, id, mins(30)).unwrap();
        assert!(matches!(resumed, TimerEvent::Started { resumed_ms: 600_000, .. }));
        pause(&mut store, id, mins(35)).unwrap();

        let TimerEvent::Finished { log, total_ms, .. } = finish(&mut store, id, mins(40)).unwrap()
        else {
            panic!("expected finish");
        };
        assert_eq!(total_ms, 15 * 60_000);
        let log = log.unwrap();
        assert_eq!(log.duration_ms(), 15 * 60_000);
        assert_eq!(log.end_at, mins(40));
        assert_eq!(log.start_at, mins(25));
        assert_eq!(store.logs().len(), 1);
        assert_eq!(timer_state(&store, id), TimerState::Idle);
    }

    #[test]
    fn finish_running_with_carry_over() {
        let (mut store, ids) = setup(Settings::default(), 1);
        let id = &ids[0];
        start(&mut store, id, t0()).unwrap();
        pause(&mut store, id, mins(5)).unwrap();
        start(&mut store, id, mins(20)).unwrap();

        let event = finish(&mut store, id, mins(30)).unwrap();
        let TimerEvent::Finished { total_ms, ticking_stopped, archived, .. } = event else {
            panic!("expected finish");
        };
        assert_eq!(total_ms, 15 * 60_000);
        assert!(ticking_stopped);
        assert!(archived);
        assert!(store.task(id.as_str()).unwrap().archived);
    }

    #[test]
    fn finish_without_archiving_when_disabled() {
        let settings = Settings {
            archive_on_finish: false,
            ..Settings::default()
        };
        let (mut store, ids) = setup(settings, 1);
        start(&mut store, &ids[0], t0()).unwrap();
        let event = finish(&mut store, &ids[0], mins(1)).unwrap();
        assert!(matches!(event, TimerEvent::Finished { archived: false, .. }));
        assert!(!store.task(ids[0].as_str()).unwrap().archived);
    }

    #[test]
    fn zero_length_finish_records_nothing() {
        let (mut store, ids) = setup(Settings::default(), 1);
        start(&mut store, &ids[0], t0()).unwrap();
        let event = finish(&mut store, &ids[0], t0()).unwrap();
        assert!(matches!(event, TimerEvent::Finished { log: None, total_ms: 0, .. }));
        assert!(store.logs().is_empty());
        assert_eq!(timer_state(&store, &ids[0]), TimerState::Idle);
    }

    #[test]
    fn finish_idle_task_is_rejected() {
        let (mut store, ids) = setup(Settings::default(), 1);
        assert_eq!(
            finish(&mut store, &ids[0], t0()),
            Err(TimerRejection::NotActive(ids[0].clone()))
        );
    }

    #[test]
    fn pause_requires_running() {
        let (mut store, ids) = setup(Settings::default(), 1);
        assert_eq!(
            pause(&mut store, &ids[0], t0()),
            Err(TimerRejection::NotRunning(ids[0].clone()))
        );
    }

    #[test]
    fn cancel_discards_without_log() {
        let (mut store, ids) = setup(Settings::default(), 1);
        start(&mut store, &ids[0], t0()).unwrap();
        let event = cancel(&mut store, &ids[0], mins(7)).unwrap();
        assert_eq!(
            event,
            TimerEvent::Cancelled {
                task_id: ids[0].clone(),
                discarded_ms: 7 * 60_000,
                ticking_stopped: true
            }
        );
        assert!(store.logs().is_empty());
        assert_eq!(timer_state(&store, &ids[0]), TimerState::Idle);
    }

    #[test]
    fn cancel_paused_timer_is_rejected() {
        let (mut store, ids) = setup(Settings::default(), 1);
        start(&mut store, &ids[0], t0()).unwrap();
        pause(&mut store, &ids[0], mins(1)).unwrap();
        assert_eq!(
            cancel(&mut store, &ids[0], mins(2)),
            Err(TimerRejection::NotRunning(ids[0].clone()))
        );
        assert_eq!(store.paused_ms(&ids[0]), Some(60_000));
    }

    #[test]
    fn multi_mode_enforces_capacity() {
        let (mut store, ids) = setup(multi(2), 3);
        start(&mut store, &ids[0], t0()).unwrap();
        let second = start(&mut store, &ids[1], t0()).unwrap();
        assert!(matches!(second, TimerEvent::Started { ticking_started: false, .. }));

        let before = store.active_sessions().to_vec();
        assert_eq!(
            start(&mut store, &ids[2], t0()),
            Err(TimerRejection::CapacityReached { max: 2 })
        );
        assert_eq!(store.active_sessions(), before.as_slice());
    }

    #[test]
    fn single_mode_pauses_running_task() {
        let settings = Settings {
            concurrency_mode: ConcurrencyMode::Single,
            ..Settings::default()
        };
        let (mut store, ids) = setup(settings, 2);
        start(&mut store, &ids[0], t0()).unwrap();

        let event = start(&mut store, &ids[1], mins(3)).unwrap();
        let TimerEvent::Started { auto_paused, ticking_started, .. } = event else {
            panic!("expected start");
        };
        assert_eq!(auto_paused, vec![(ids[0].clone(), 180_000)]);
        assert!(!ticking_started);
        assert_eq!(timer_state(&store, &ids[0]), TimerState::Paused);
        assert_eq!(timer_state(&store, &ids[1]), TimerState::Running);
        assert_eq!(store.active_sessions().len(), 1);
    }

    #[test]
    fn toggle_alternates() {
        let (mut store, ids) = setup(Settings::default(), 1);
        assert!(matches!(
            toggle(&mut store, &ids[0], t0()).unwrap(),
            TimerEvent::Started { .. }
        ));
        assert!(matches!(
            toggle(&mut store, &ids[0], mins(1)).unwrap(),
            TimerEvent::Paused { .. }
        ));
        assert!(matches!(
            toggle(&mut store, &ids[0], mins(2)).unwrap(),
            TimerEvent::Started { resumed_ms: 60_000, .. }
        ));
    }

    #[test]
    fn no_double_running_over_mixed_sequence() {
        let (mut store, ids) = setup(multi(3), 3);
        let ops: [(usize, u8); 12] = [
            (0, 0), (1, 0), (0, 0), (0, 1), (0, 0), (2, 0),
            (1, 2), (1, 0), (2, 3), (0, 2), (0, 0), (1, 1),
        ];
        for (step, (task, op)) in ops.iter().enumerate() {
            let id = &ids[*task];
            let now = mins(i64::try_from(step).unwrap());
            let _ = match op {
                0 => start(&mut store, id, now),
                1 => pause(&mut store, id, now),
                2 => finish(&mut store, id, now),
                _ => cancel(&mut store, id, now),
            };
            for id in &ids {
                let running = store
                    .active_sessions()
                    .iter()
                    .filter(|a| &a.task_id == id)
                    .count();
                assert!(running <= 1);
                assert!(!(running == 1 && store.paused_ms(id).is_some()));
            }
        }
    }
}
