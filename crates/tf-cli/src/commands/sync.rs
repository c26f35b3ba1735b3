//! Sync command: reconcile the local document with the remote copy.

use anyhow::{Context, Result};
use chrono::Utc;
use tf_core::{TrackerState, merge_with};
use tf_db::{Database, load_existing};

use crate::document::{Document, open_remote};

#[derive(Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub user: String,
    pub tasks: usize,
    pub logs: usize,
    /// Tasks only the remote copy had.
    pub tasks_pulled: usize,
    /// Logs only the remote copy had.
    pub logs_pulled: usize,
}

/// Merges `local` with `user`'s remote document and writes the result back.
///
/// A missing or unreadable remote document counts as absent: the local
/// state, settings included, is pushed unchanged.
pub fn sync_with(db: &Database, user: &str, local: &TrackerState) -> Result<(TrackerState, SyncReport)> {
    let remote = load_existing(&db.user(user));
    let merged = merge_with(local, remote.as_ref());
    db.save_state(user, &merged, Utc::now())
        .with_context(|| format!("failed to write remote document for '{user}'"))?;

    let report = SyncReport {
        user: user.to_string(),
        tasks: merged.items.len(),
        logs: merged.sessions.len(),
        tasks_pulled: merged.items.len().saturating_sub(local.items.len()),
        logs_pulled: merged.sessions.len().saturating_sub(local.sessions.len()),
    };
    Ok((merged, report))
}

pub fn run(doc: &mut Document) -> Result<SyncReport> {
    let user = doc
        .config()
        .user
        .clone()
        .filter(|u| !u.trim().is_empty())
        .context("No user configured. Set `user` in config.toml, TF_USER, or pass --user.")?;

    let db = open_remote(doc.config())?;
    let (merged, report) = sync_with(&db, &user, doc.tracker.state())?;
    doc.replace(merged);
    doc.file()
        .save(doc.tracker.state())
        .with_context(|| format!("failed to write {}", doc.file().path().display()))?;
    tracing::info!(user = %report.user, pulled = report.tasks_pulled, "synced");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};
    use tf_core::{ConcurrencyMode, TaskDraft, Tracker, WeekStart};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, 9, 0, 0).unwrap()
    }

    fn state_with(names: &[&str]) -> TrackerState {
        let mut tracker = Tracker::new(TrackerState::default());
        for name in names {
            tracker.create_task(TaskDraft::named(*name), t0()).unwrap();
        }
        tracker.into_state()
    }

    #[test]
    fn test_sync_with_empty_remote_pushes_local() {
        let db = Database::open_in_memory().unwrap();
        let local = state_with(&["Write"]);

        let (merged, report) = sync_with(&db, "sam", &local).unwrap();
        assert_eq!(merged, local);
        assert_eq!(report.tasks_pulled, 0);
        assert_eq!(db.load_state("sam").unwrap().unwrap(), local);
    }

    #[test]
    fn test_first_sync_keeps_local_settings() {
        let db = Database::open_in_memory().unwrap();
        let mut local = state_with(&["Write"]);
        local.settings.concurrency_mode = ConcurrencyMode::Single;
        local.settings.max_concurrent = 3;
        local.settings.week_starts_on = WeekStart::Sunday;

        let (merged, _) = sync_with(&db, "sam", &local).unwrap();
        assert_eq!(merged.settings, local.settings);
        assert_eq!(db.load_state("sam").unwrap().unwrap().settings, local.settings);
    }

    #[test]
    fn test_sync_adopts_existing_remote_settings() {
        let db = Database::open_in_memory().unwrap();
        let mut remote = TrackerState::default();
        remote.settings.week_starts_on = WeekStart::Sunday;
        db.save_state("sam", &remote, t0()).unwrap();

        let (merged, _) = sync_with(&db, "sam", &state_with(&["Write"])).unwrap();
        assert_eq!(merged.settings.week_starts_on, WeekStart::Sunday);
    }

    #[test]
    fn test_sync_pulls_remote_only_tasks() {
        let db = Database::open_in_memory().unwrap();
        let remote = state_with(&["Review"]);
        db.save_state("sam", &remote, t0()).unwrap();
        let local = state_with(&["Write"]);

        let (merged, report) = sync_with(&db, "sam", &local).unwrap();
        let names: Vec<&str> = merged.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Write", "Review"]);
        assert_eq!(report.tasks, 2);
        assert_eq!(report.tasks_pulled, 1);
        assert_eq!(db.load_state("sam").unwrap().unwrap(), merged);
    }

    #[test]
    fn test_sync_keeps_newer_edit() {
        let db = Database::open_in_memory().unwrap();
        let mut local = Tracker::new(state_with(&["Write"]));
        let id = local.store().tasks()[0].id.clone();
        let mut remote = Tracker::new(local.state().clone());
        remote
            .update_task(&id, TaskDraft::named("Write v2"), t0() + Duration::hours(1))
            .unwrap();
        db.save_state("sam", remote.state(), t0()).unwrap();
        local
            .update_task(&id, TaskDraft::named("Write v1"), t0() + Duration::minutes(30))
            .unwrap();

        let (merged, _) = sync_with(&db, "sam", local.state()).unwrap();
        assert_eq!(merged.items[0].name, "Write v2");
    }
}
