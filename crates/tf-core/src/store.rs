//! In-memory session store.
//!
//! [`SessionStore`] exclusively owns the four collections of a
//! [`TrackerState`]: tasks, logs, running timers and paused accumulators.
//! Public methods are CRUD operations that validate before mutating;
//! timer transitions go through the crate-private primitives used by
//! [`crate::timer`].
//!
//! # Invariants
//!
//! - Task and log IDs are unique.
//! - Every log ends strictly after it starts.
//! - At most one running timer per task.
//! - A task is never both running and paused.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    ActiveSession, COLORS, LogDraft, LogEntry, Settings, Task, TaskDraft, TrackerState,
};
use crate::types::{LogId, TaskId, ValidationError};

/// Errors from store CRUD operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no task with ID {0}")]
    TaskNotFound(TaskId),

    #[error("no log with ID {0}")]
    LogNotFound(LogId),
}

/// Filter for listing logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub task_id: Option<TaskId>,
    /// Only logs starting at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only logs starting before this instant.
    pub until: Option<DateTime<Utc>>,
}

/// The owned, validated state of the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStore {
    state: TrackerState,
}

impl SessionStore {
    /// Builds a store from a loaded document, repairing invariant violations.
    ///
    /// Loaded data may come from older versions or hand edits, so duplicate
    /// timers, timers of unknown tasks, paused entries of running tasks and
    /// logs that do not end after they start are dropped with a warning.
    pub fn from_state(mut state: TrackerState) -> Self {
        let task_ids: HashSet<TaskId> = state.items.iter().map(|t| t.id.clone()).collect();

        let mut seen = HashSet::new();
        state.active_sessions.retain(|active| {
            let keep = task_ids.contains(&active.task_id) && seen.insert(active.task_id.clone());
            if !keep {
                tracing::warn!(task_id = %active.task_id, "dropping invalid running timer");
            }
            keep
        });

        state.paused_sessions.retain(|task_id, ms| {
            let keep = task_ids.contains(task_id) && !seen.contains(task_id) && *ms >= 0;
            if !keep {
                tracing::warn!(%task_id, "dropping invalid paused timer");
            }
            keep
        });

        let before = state.sessions.len();
        state.sessions.retain(|log| log.end_at > log.start_at);
        if state.sessions.len() != before {
            tracing::warn!(
                dropped = before - state.sessions.len(),
                "dropping logs that do not end after they start"
            );
        }

        if state.settings.validate().is_err() {
            tracing::warn!(
                max_concurrent = state.settings.max_concurrent,
                "invalid concurrency limit, restoring default"
            );
            state.settings.max_concurrent = crate::model::DEFAULT_MAX_CONCURRENT;
        }

        Self { state }
    }

    /// Returns the plain document for persistence.
    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn into_state(self) -> TrackerState {
        self.state
    }

    pub const fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Replaces settings after validation.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), StoreError> {
        settings.validate()?;
        self.state.settings = settings;
        Ok(())
    }

    // ========== Tasks ==========

    pub fn tasks(&self) -> &[Task] {
        &self.state.items
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.items.iter().find(|t| t.id.as_str() == id)
    }

    /// Resolves a task by full ID or unique ID prefix.
    pub fn find_task(&self, id_or_prefix: &str) -> Option<&Task> {
        if let Some(task) = self.task(id_or_prefix) {
            return Some(task);
        }
        let mut matches = self
            .state
            .items
            .iter()
            .filter(|t| t.id.as_str().starts_with(id_or_prefix));
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    fn task_mut(&mut self, id: &TaskId) -> Result<&mut Task, StoreError> {
        self.state
            .items
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))
    }

    /// Creates a task and appends it to the task list.
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, StoreError> {
        let draft = draft.normalized()?;
        let color = draft
            .color
            .unwrap_or_else(|| COLORS[self.state.items.len() % COLORS.len()].to_string());
        let task = Task {
            id: TaskId::generate(),
            name: draft.name,
            color,
            note: draft.note,
            estimated_hours: draft.estimated_hours,
            due_date: draft.due_date,
            archived: false,
            archived_at: None,
            created_at: now,
            updated_at: Some(now),
        };
        tracing::debug!(task_id = %task.id, name = %task.name, "created task");
        self.state.items.push(task);
        Ok(&self.state.items[self.state.items.len() - 1])
    }

    /// Replaces the editable fields of a task. A missing color keeps the current one.
    pub fn update_task(
        &mut self,
        id: &TaskId,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<&Task, StoreError> {
        let draft = draft.normalized()?;
        let task = self.task_mut(id)?;
        task.name = draft.name;
        if let Some(color) = draft.color {
            task.color = color;
        }
        task.note = draft.note;
        task.estimated_hours = draft.estimated_hours;
        task.due_date = draft.due_date;
        task.updated_at = Some(now);
        Ok(task)
    }

    /// Soft-deletes a task.
    ///
    /// Any running or paused timer of the task is discarded without a log.
    /// Returns the discarded milliseconds, if there was a timer.
    pub fn archive_task(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<Option<i64>, StoreError> {
        let task = self.task_mut(id)?;
        task.archived = true;
        task.archived_at = Some(now);
        task.updated_at = Some(now);

        let discarded = self.clear_timer(id, now);
        if let Some(ms) = discarded {
            tracing::debug!(task_id = %id, discarded_ms = ms, "archiving discarded timer");
        }
        Ok(discarded)
    }

    pub fn restore_task(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let task = self.task_mut(id)?;
        task.archived = false;
        task.archived_at = None;
        task.updated_at = Some(now);
        Ok(())
    }

    /// Hard-deletes a task with all of its logs and timer state.
    ///
    /// Returns the number of logs removed.
    pub fn delete_task_permanently(&mut self, id: &TaskId) -> Result<usize, StoreError> {
        let index = self
            .state
            .items
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        self.state.items.remove(index);

        let before = self.state.sessions.len();
        self.state.sessions.retain(|log| &log.task_id != id);
        let removed = before - self.state.sessions.len();

        self.state.active_sessions.retain(|a| &a.task_id != id);
        self.state.paused_sessions.remove(id);

        tracing::debug!(task_id = %id, logs_removed = removed, "deleted task");
        Ok(removed)
    }

    /// Moves `dragged` to the position currently held by `target`.
    pub fn reorder_task(&mut self, dragged: &TaskId, target: &TaskId) -> Result<(), StoreError> {
        let from = self.position(dragged)?;
        let to = self.position(target)?;
        let task = self.state.items.remove(from);
        self.state.items.insert(to, task);
        Ok(())
    }

    fn position(&self, id: &TaskId) -> Result<usize, StoreError> {
        self.state
            .items
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))
    }

    /// Moves a task to the front of the list. Unknown IDs are ignored.
    pub fn move_task_to_front(&mut self, id: &TaskId) {
        if let Ok(index) = self.position(id) {
            let task = self.state.items.remove(index);
            self.state.items.insert(0, task);
        }
    }

    /// Moves a task to the back of the list. Unknown IDs are ignored.
    pub fn move_task_to_back(&mut self, id: &TaskId) {
        if let Ok(index) = self.position(id) {
            let task = self.state.items.remove(index);
            self.state.items.push(task);
        }
    }

    // ========== Logs ==========

    pub fn logs(&self) -> &[LogEntry] {
        &self.state.sessions
    }

    pub fn log(&self, id: &str) -> Option<&LogEntry> {
        self.state.sessions.iter().find(|l| l.id.as_str() == id)
    }

    /// Logs matching `filter`, newest first.
    pub fn list_logs(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        let mut logs: Vec<&LogEntry> = self
            .state
            .sessions
            .iter()
            .filter(|l| filter.task_id.as_ref().is_none_or(|id| &l.task_id == id))
            .filter(|l| filter.from.is_none_or(|from| l.start_at >= from))
            .filter(|l| filter.until.is_none_or(|until| l.start_at < until))
            .collect();
        logs.sort_by_key(|l| std::cmp::Reverse(l.start_at));
        logs
    }

    /// Creates a manual log after validating its interval and task.
    pub fn create_log(&mut self, draft: LogDraft) -> Result<&LogEntry, StoreError> {
        draft.validate()?;
        self.require_task(&draft.task_id)?;
        let log = LogEntry {
            id: LogId::generate(),
            task_id: draft.task_id,
            start_at: draft.start_at,
            end_at: draft.end_at,
            note: draft.note.filter(|n| !n.trim().is_empty()),
        };
        self.state.sessions.push(log);
        Ok(&self.state.sessions[self.state.sessions.len() - 1])
    }

    /// Replaces a log's fields after re-validating them.
    pub fn update_log(&mut self, id: &LogId, draft: LogDraft) -> Result<&LogEntry, StoreError> {
        draft.validate()?;
        self.require_task(&draft.task_id)?;
        let log = self
            .state
            .sessions
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| StoreError::LogNotFound(id.clone()))?;
        log.task_id = draft.task_id;
        log.start_at = draft.start_at;
        log.end_at = draft.end_at;
        log.note = draft.note.filter(|n| !n.trim().is_empty());
        Ok(log)
    }

    pub fn delete_log(&mut self, id: &LogId) -> Result<LogEntry, StoreError> {
        let index = self
            .state
            .sessions
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| StoreError::LogNotFound(id.clone()))?;
        Ok(self.state.sessions.remove(index))
    }

    fn require_task(&self, id: &TaskId) -> Result<(), StoreError> {
        if self.task(id.as_str()).is_none() {
            return Err(StoreError::TaskNotFound(id.clone()));
        }
        Ok(())
    }

    // ========== Timer primitives ==========

    pub fn active_sessions(&self) -> &[ActiveSession] {
        &self.state.active_sessions
    }

    pub fn active_session(&self, id: &TaskId) -> Option<&ActiveSession> {
        self.state.active_sessions.iter().find(|a| &a.task_id == id)
    }

    pub fn paused_ms(&self, id: &TaskId) -> Option<i64> {
        self.state.paused_sessions.get(id).copied()
    }

    pub fn paused_sessions(&self) -> impl Iterator<Item = (&TaskId, i64)> {
        self.state.paused_sessions.iter().map(|(id, ms)| (id, *ms))
    }

    /// Registers a running timer, consuming any paused time of the task.
    pub(crate) fn begin_run(&mut self, id: &TaskId, now: DateTime<Utc>) -> &ActiveSession {
        let accumulated_ms = self.state.paused_sessions.remove(id).unwrap_or(0);
        self.state.active_sessions.push(ActiveSession {
            task_id: id.clone(),
            start_at: now,
            accumulated_ms,
        });
        &self.state.active_sessions[self.state.active_sessions.len() - 1]
    }

    /// Removes a running timer and returns it.
    pub(crate) fn take_active(&mut self, id: &TaskId) -> Option<ActiveSession> {
        let index = self
            .state
            .active_sessions
            .iter()
            .position(|a| &a.task_id == id)?;
        Some(self.state.active_sessions.remove(index))
    }

    pub(crate) fn set_paused(&mut self, id: &TaskId, ms: i64) {
        self.state.paused_sessions.insert(id.clone(), ms.max(0));
    }

    pub(crate) fn take_paused(&mut self, id: &TaskId) -> Option<i64> {
        self.state.paused_sessions.remove(id)
    }

    /// Appends a finalized log. The caller guarantees `end > start`.
    pub(crate) fn push_log(&mut self, log: LogEntry) {
        self.state.sessions.push(log);
    }

    pub(crate) fn mark_archived(&mut self, id: &TaskId, now: DateTime<Utc>) {
        if let Ok(task) = self.task_mut(id) {
            task.archived = true;
            task.archived_at = Some(now);
            task.updated_at = Some(now);
        }
    }

    /// Drops any running or paused timer of a task, returning its total.
    fn clear_timer(&mut self, id: &TaskId, now: DateTime<Utc>) -> Option<i64> {
        let running = self.take_active(id).map(|a| a.total_ms(now));
        let paused = self.take_paused(id);
        running.or(paused)
    }

    /// Wipes every task, log, timer and setting.
    pub fn reset(&mut self) {
        self.state = TrackerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, 9, 0, 0).unwrap()
    }

    fn store_with_tasks(names: &[&str]) -> (SessionStore, Vec<TaskId>) {
        let mut store = SessionStore::default();
        let ids = names
            .iter()
            .map(|name| store.create_task(TaskDraft::named(*name), now()).unwrap().id.clone())
            .collect();
        (store, ids)
    }

    fn draft(task_id: &TaskId, start_min: i64, end_min: i64) -> LogDraft {
        LogDraft {
            task_id: task_id.clone(),
            start_at: now() + Duration::minutes(start_min),
            end_at: now() + Duration::minutes(end_min),
            note: None,
        }
    }

    #[test]
    fn create_task_assigns_palette_color() {
        let (store, ids) = store_with_tasks(&["Write", "Review"]);
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.task(ids[0].as_str()).unwrap().color, COLORS[0]);
        assert_eq!(store.task(ids[1].as_str()).unwrap().color, COLORS[1]);
    }

    #[test]
    fn create_task_rejects_empty_name() {
        let mut store = SessionStore::default();
        let err = store.create_task(TaskDraft::named("  "), now()).unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation(ValidationError::Empty { field: "task name" })
        );
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn update_task_keeps_id_and_bumps_updated_at() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        let later = now() + Duration::hours(1);
        let task = store
            .update_task(&ids[0], TaskDraft::named("Write docs"), later)
            .unwrap();
        assert_eq!(task.id, ids[0]);
        assert_eq!(task.name, "Write docs");
        assert_eq!(task.color, COLORS[0]);
        assert_eq!(task.updated_at, Some(later));
    }

    #[test]
    fn find_task_accepts_unique_prefix() {
        let mut store = SessionStore::from_state(TrackerState {
            items: ["abc1", "abd2"]
                .iter()
                .map(|id| Task {
                    id: TaskId::new(*id).unwrap(),
                    name: (*id).to_string(),
                    color: COLORS[0].to_string(),
                    note: None,
                    estimated_hours: None,
                    due_date: None,
                    archived: false,
                    archived_at: None,
                    created_at: now(),
                    updated_at: None,
                })
                .collect(),
            ..TrackerState::default()
        });
        assert_eq!(store.find_task("abc").unwrap().id.as_str(), "abc1");
        assert!(store.find_task("ab").is_none(), "ambiguous prefix");
        assert!(store.find_task("zz").is_none());
        store.reset();
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn archive_and_restore_round_trip() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        store.archive_task(&ids[0], now()).unwrap();
        let task = store.task(ids[0].as_str()).unwrap();
        assert!(task.archived);
        assert_eq!(task.archived_at, Some(now()));

        store.restore_task(&ids[0], now()).unwrap();
        let task = store.task(ids[0].as_str()).unwrap();
        assert!(!task.archived);
        assert_eq!(task.archived_at, None);
    }

    #[test]
    fn archive_discards_running_timer() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        store.begin_run(&ids[0], now());
        let discarded = store
            .archive_task(&ids[0], now() + Duration::minutes(5))
            .unwrap();
        assert_eq!(discarded, Some(300_000));
        assert!(store.active_sessions().is_empty());
        assert!(store.logs().is_empty());
    }

    #[test]
    fn delete_cascades_to_logs_and_timers() {
        let (mut store, ids) = store_with_tasks(&["Write", "Review"]);
        for i in 0..3 {
            store.create_log(draft(&ids[0], i * 10, i * 10 + 5)).unwrap();
        }
        store.create_log(draft(&ids[1], 0, 5)).unwrap();
        store.set_paused(&ids[0], 1_000);

        let removed = store.delete_task_permanently(&ids[0]).unwrap();

        assert_eq!(removed, 3);
        assert_eq!(store.logs().len(), 1);
        assert!(store.logs().iter().all(|l| l.task_id != ids[0]));
        assert!(store.task(ids[0].as_str()).is_none());
        assert_eq!(store.paused_ms(&ids[0]), None);
    }

    #[test]
    fn delete_unknown_task_fails() {
        let mut store = SessionStore::default();
        let id = TaskId::new("missing").unwrap();
        assert_eq!(
            store.delete_task_permanently(&id),
            Err(StoreError::TaskNotFound(id))
        );
    }

    #[test]
    fn create_log_rejects_non_positive_interval() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        let before = store.logs().len();
        assert!(store.create_log(draft(&ids[0], 10, 10)).is_err());
        assert!(store.create_log(draft(&ids[0], 10, 5)).is_err());
        assert_eq!(store.logs().len(), before);
    }

    #[test]
    fn update_log_rejects_invalid_edit_without_change() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        let id = store.create_log(draft(&ids[0], 0, 30)).unwrap().id.clone();
        let original = store.log(id.as_str()).unwrap().clone();

        assert!(store.update_log(&id, draft(&ids[0], 30, 0)).is_err());
        assert_eq!(store.log(id.as_str()).unwrap(), &original);
        assert_eq!(store.logs().len(), 1);

        let updated = store.update_log(&id, draft(&ids[0], 0, 45)).unwrap();
        assert_eq!(updated.duration_ms(), 45 * 60_000);
    }

    #[test]
    fn create_log_requires_known_task() {
        let mut store = SessionStore::default();
        let ghost = TaskId::new("ghost").unwrap();
        assert_eq!(
            store.create_log(draft(&ghost, 0, 5)).unwrap_err(),
            StoreError::TaskNotFound(ghost)
        );
    }

    #[test]
    fn delete_log_removes_only_that_log() {
        let (mut store, ids) = store_with_tasks(&["Write"]);
        let keep = store.create_log(draft(&ids[0], 0, 5)).unwrap().id.clone();
        let drop = store.create_log(draft(&ids[0], 10, 15)).unwrap().id.clone();
        store.delete_log(&drop).unwrap();
        assert_eq!(store.logs().len(), 1);
        assert_eq!(store.logs()[0].id, keep);
        assert!(store.delete_log(&drop).is_err());
    }

    #[test]
    fn list_logs_filters_and_sorts_newest_first() {
        let (mut store, ids) = store_with_tasks(&["Write", "Review"]);
        store.create_log(draft(&ids[0], 0, 5)).unwrap();
        store.create_log(draft(&ids[0], 60, 65)).unwrap();
        store.create_log(draft(&ids[1], 30, 35)).unwrap();

        let all = store.list_logs(&LogFilter::default());
        let starts: Vec<_> = all.iter().map(|l| l.start_at).collect();
        assert_eq!(
            starts,
            vec![
                now() + Duration::minutes(60),
                now() + Duration::minutes(30),
                now()
            ]
        );

        let filtered = store.list_logs(&LogFilter {
            task_id: Some(ids[0].clone()),
            from: Some(now() + Duration::minutes(1)),
            until: None,
        });
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].start_at, now() + Duration::minutes(60));
    }

    #[test]
    fn reorder_moves_dragged_to_target_slot() {
        let (mut store, ids) = store_with_tasks(&["A", "B", "C"]);
        store.reorder_task(&ids[2], &ids[0]).unwrap();
        let names: Vec<_> = store.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        store.move_task_to_back(&ids[2]);
        store.move_task_to_front(&ids[1]);
        let names: Vec<_> = store.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn from_state_repairs_invariant_violations() {
        let (store, ids) = store_with_tasks(&["Write"]);
        let mut state = store.into_state();
        let ghost = TaskId::new("ghost").unwrap();
        let active = ActiveSession {
            task_id: ids[0].clone(),
            start_at: now(),
            accumulated_ms: 0,
        };
        state.active_sessions = vec![active.clone(), active];
        state.active_sessions.push(ActiveSession {
            task_id: ghost.clone(),
            start_at: now(),
            accumulated_ms: 0,
        });
        state.paused_sessions.insert(ids[0].clone(), 5_000);
        state.paused_sessions.insert(ghost, 5_000);
        state.sessions.push(LogEntry {
            id: LogId::new("bad").unwrap(),
            task_id: ids[0].clone(),
            start_at: now(),
            end_at: now(),
            note: None,
        });
        state.settings.max_concurrent = 0;

        let store = SessionStore::from_state(state);

        assert_eq!(store.active_sessions().len(), 1);
        assert_eq!(store.paused_sessions().count(), 0);
        assert!(store.logs().is_empty());
        assert_eq!(store.settings().max_concurrent, 10);
    }

    #[test]
    fn update_settings_validates() {
        let mut store = SessionStore::default();
        let settings = Settings {
            max_concurrent: 0,
            ..Settings::default()
        };
        assert!(store.update_settings(settings).is_err());
        assert_eq!(store.settings().max_concurrent, 10);
    }
}
