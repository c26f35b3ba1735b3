//! Reconciliation of a local document with a remote copy.
//!
//! - Tasks: per ID, the copy with the later `updatedAt` wins; ties keep local.
//! - Logs: union by ID; the remote copy replaces a local one with the same ID.
//! - Timers: union with local winning per task, then paused entries of
//!   running tasks and entries of unknown tasks are dropped.
//! - Settings: taken from remote when a remote document exists.

use std::collections::{HashMap, HashSet};

use crate::model::TrackerState;
use crate::types::TaskId;

/// Merges `remote` into `local`. Neither input is modified.
pub fn merge(local: &TrackerState, remote: &TrackerState) -> TrackerState {
    let mut items = local.items.clone();
    let index: HashMap<TaskId, usize> = items
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.clone(), i))
        .collect();
    for task in &remote.items {
        match index.get(&task.id) {
            Some(&i) => {
                if task.updated_at > items[i].updated_at {
                    items[i] = task.clone();
                }
            }
            None => items.push(task.clone()),
        }
    }

    let mut sessions = local.sessions.clone();
    let index: HashMap<_, usize> = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();
    for log in &remote.sessions {
        match index.get(&log.id) {
            Some(&i) => sessions[i] = log.clone(),
            None => sessions.push(log.clone()),
        }
    }

    let known: HashSet<&TaskId> = items.iter().map(|t| &t.id).collect();
    let local_timers: HashSet<&TaskId> = local
        .active_sessions
        .iter()
        .map(|a| &a.task_id)
        .chain(local.paused_sessions.keys())
        .collect();

    let mut active_sessions = local.active_sessions.clone();
    active_sessions.extend(
        remote
            .active_sessions
            .iter()
            .filter(|a| !local_timers.contains(&a.task_id))
            .cloned(),
    );
    let mut seen = HashSet::new();
    active_sessions.retain(|a| known.contains(&a.task_id) && seen.insert(a.task_id.clone()));

    let mut paused_sessions = local.paused_sessions.clone();
    for (task_id, ms) in &remote.paused_sessions {
        if !local_timers.contains(task_id) {
            paused_sessions.insert(task_id.clone(), *ms);
        }
    }
    paused_sessions.retain(|task_id, _| known.contains(task_id) && !seen.contains(task_id));

    TrackerState {
        items,
        sessions,
        active_sessions,
        paused_sessions,
        settings: remote.settings.clone(),
    }
}

/// Merges with a remote copy that may not exist yet.
///
/// Without one, `local` is returned as is, settings included.
pub fn merge_with(local: &TrackerState, remote: Option<&TrackerState>) -> TrackerState {
    remote.map_or_else(|| local.clone(), |remote| merge(local, remote))
}
