//! The engine facade.
//!
//! A [`Tracker`] owns a [`SessionStore`] for the duration of a session and
//! exposes every timer transition, CRUD operation and read model. Callers
//! build it from a loaded document and hand the document back for saving:
//!
//! ```
//! use chrono::Utc;
//! use tf_core::{Tracker, TrackerState, TaskDraft};
//!
//! let mut tracker = Tracker::new(TrackerState::default());
//! let now = Utc::now();
//! let id = tracker.create_task(TaskDraft::named("Write"), now).unwrap().id.clone();
//! tracker.start_timer(&id, now).unwrap();
//! assert!(tracker.is_ticking());
//! let state = tracker.into_state();
//! assert_eq!(state.active_sessions.len(), 1);
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{LogDraft, LogEntry, Settings, Task, TaskDraft, TrackerState};
use crate::store::{LogFilter, SessionStore, StoreError};
use crate::summary::{Summary, SummaryQuery, compute_summary};
use crate::timer::{self, TimerEvent, TimerRejection, TimerState};
use crate::types::{LogId, TaskId};

/// Reorders the task list in response to timer transitions.
pub trait OrderingPolicy {
    fn on_start(&self, store: &mut SessionStore, task_id: &TaskId);
    fn on_finish(&self, store: &mut SessionStore, task_id: &TaskId, archived: bool);
}

/// Started tasks move to the front; finished and archived tasks to the back.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostRecentFirst;

impl OrderingPolicy for MostRecentFirst {
    fn on_start(&self, store: &mut SessionStore, task_id: &TaskId) {
        store.move_task_to_front(task_id);
    }

    fn on_finish(&self, store: &mut SessionStore, task_id: &TaskId, archived: bool) {
        if archived {
            store.move_task_to_back(task_id);
        }
    }
}

/// Leaves the task list in manual order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unordered;

impl OrderingPolicy for Unordered {
    fn on_start(&self, _store: &mut SessionStore, _task_id: &TaskId) {}

    fn on_finish(&self, _store: &mut SessionStore, _task_id: &TaskId, _archived: bool) {}
}

#[derive(Debug, Clone)]
pub struct Tracker<O: OrderingPolicy = MostRecentFirst> {
    store: SessionStore,
    ordering: O,
}

impl Tracker<MostRecentFirst> {
    pub fn new(state: TrackerState) -> Self {
        Self::with_ordering(state, MostRecentFirst)
    }
}

impl<O: OrderingPolicy> Tracker<O> {
    pub fn with_ordering(state: TrackerState, ordering: O) -> Self {
        Self {
            store: SessionStore::from_state(state),
            ordering,
        }
    }

    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    pub const fn state(&self) -> &TrackerState {
        self.store.state()
    }

    pub fn into_state(self) -> TrackerState {
        self.store.into_state()
    }

    // ========== Timer ==========

    pub fn start_timer(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimerEvent, TimerRejection> {
        let event = timer::start(&mut self.store, task_id, now)?;
        self.ordering.on_start(&mut self.store, task_id);
        Ok(event)
    }

    pub fn pause_timer(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimerEvent, TimerRejection> {
        timer::pause(&mut self.store, task_id, now)
    }

    pub fn toggle_timer(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimerEvent, TimerRejection> {
        let event = timer::toggle(&mut self.store, task_id, now)?;
        if matches!(event, TimerEvent::Started { .. }) {
            self.ordering.on_start(&mut self.store, task_id);
        }
        Ok(event)
    }

    pub fn finish_timer(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimerEvent, TimerRejection> {
        let event = timer::finish(&mut self.store, task_id, now)?;
        if let TimerEvent::Finished { archived, .. } = &event {
            self.ordering.on_finish(&mut self.store, task_id, *archived);
        }
        Ok(event)
    }

    pub fn cancel_timer(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<TimerEvent, TimerRejection> {
        timer::cancel(&mut self.store, task_id, now)
    }

    pub fn timer_state(&self, task_id: &TaskId) -> TimerState {
        timer::timer_state(&self.store, task_id)
    }

    pub fn is_ticking(&self) -> bool {
        timer::is_ticking(&self.store)
    }

    // ========== Read models ==========

    pub fn compute_summary<Tz: TimeZone>(
        &self,
        query: &SummaryQuery,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Summary {
        compute_summary(&self.store, query, now, tz)
    }

    pub fn list_logs(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        self.store.list_logs(filter)
    }

    pub fn find_task(&self, id_or_prefix: &str) -> Option<&Task> {
        self.store.find_task(id_or_prefix)
    }

    // ========== CRUD ==========

    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, StoreError> {
        self.store.create_task(draft, now)
    }

    pub fn update_task(
        &mut self,
        task_id: &TaskId,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<&Task, StoreError> {
        self.store.update_task(task_id, draft, now)
    }

    pub fn archive_task(
        &mut self,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, StoreError> {
        self.store.archive_task(task_id, now)
    }

    pub fn restore_task(&mut self, task_id: &TaskId, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.restore_task(task_id, now)
    }

    pub fn delete_task_permanently(&mut self, task_id: &TaskId) -> Result<usize, StoreError> {
        self.store.delete_task_permanently(task_id)
    }

    pub fn reorder_task(&mut self, dragged: &TaskId, target: &TaskId) -> Result<(), StoreError> {
        self.store.reorder_task(dragged, target)
    }

    pub fn create_log(&mut self, draft: LogDraft) -> Result<&LogEntry, StoreError> {
        self.store.create_log(draft)
    }

    pub fn update_log(&mut self, log_id: &LogId, draft: LogDraft) -> Result<&LogEntry, StoreError> {
        self.store.update_log(log_id, draft)
    }

    pub fn delete_log(&mut self, log_id: &LogId) -> Result<LogEntry, StoreError> {
        self.store.delete_log(log_id)
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        self.store.update_settings(settings)
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }
}
