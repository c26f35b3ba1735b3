//! Loading and saving the tracker document around a command.

use anyhow::{Context, Result};
use chrono::Utc;
use tf_core::{Tracker, TrackerState, merge_with};
use tf_db::{Database, StateFile, load_existing, load_or_default};

use crate::Config;

/// The tracker of one command invocation together with where it came from.
pub struct Document {
    pub tracker: Tracker,
    file: StateFile,
    config: Config,
}

impl Document {
    /// Loads the local document and, when a user is configured, merges in
    /// the remote copy so changes made on other devices are kept.
    ///
    /// An unreachable remote store is reported and the local copy used alone.
    pub fn open(config: &Config) -> Self {
        let mut doc = Self::open_local(config);
        if let Some(user) = config.user.as_deref() {
            match pull_remote(config, user) {
                Ok(remote) => {
                    let merged = merge_with(doc.tracker.state(), remote.as_ref());
                    doc.replace(merged);
                }
                Err(e) => {
                    tracing::warn!(error = %e, user, "failed to read remote document");
                    eprintln!("warning: working offline: {e:#}");
                }
            }
        }
        doc
    }

    /// Loads only the local document. Missing or corrupt files start empty.
    pub fn open_local(config: &Config) -> Self {
        let file = StateFile::new(config.local_state_path());
        let state = load_or_default(&file);
        tracing::debug!(path = %file.path().display(), tasks = state.items.len(), "loaded document");
        Self {
            tracker: Tracker::new(state),
            file,
            config: config.clone(),
        }
    }

    pub const fn file(&self) -> &StateFile {
        &self.file
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the whole state, e.g. after an import or a merge.
    pub fn replace(&mut self, state: TrackerState) {
        self.tracker = Tracker::new(state);
    }

    /// Saves locally and, when a user is configured, to the remote store.
    ///
    /// Failures are reported but never undo the change: the in-memory state
    /// is what the command acted on. Returns whether every write succeeded.
    pub fn save(&self) -> bool {
        let state = self.tracker.state();
        let mut ok = true;

        if let Err(e) = self.file.save(state) {
            tracing::warn!(error = %e, "failed to save local document");
            eprintln!("warning: changes were not saved locally: {e}");
            ok = false;
        }

        if let Some(user) = self.config.user.as_deref() {
            if let Err(e) = push_remote(&self.config, user, state) {
                tracing::warn!(error = %e, user, "failed to save remote document");
                eprintln!("warning: changes were not synced: {e:#}");
                ok = false;
            }
        }
        ok
    }
}

/// Opens the remote store.
pub fn open_remote(config: &Config) -> Result<Database> {
    Database::open(&config.database_path).context("failed to open remote store")
}

fn pull_remote(config: &Config, user: &str) -> Result<Option<TrackerState>> {
    let db = open_remote(config)?;
    Ok(load_existing(&db.user(user)))
}

fn push_remote(config: &Config, user: &str, state: &TrackerState) -> Result<()> {
    let db = open_remote(config)?;
    db.save_state(user, state, Utc::now())
        .context("failed to write remote document")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_core::TaskDraft;

    fn config_in(dir: &std::path::Path, user: Option<&str>) -> Config {
        Config {
            state_path: dir.join("state.json"),
            database_path: dir.join("remote.db"),
            user: user.map(ToString::to_string),
        }
    }

    #[test]
    fn test_open_missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::open(&config_in(dir.path(), None));
        assert!(doc.tracker.state().items.is_empty());
    }

    #[test]
    fn test_save_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), None);
        let mut doc = Document::open(&config);
        doc.tracker
            .create_task(TaskDraft::named("Write"), Utc::now())
            .unwrap();
        assert!(doc.save());

        let reopened = Document::open(&config);
        assert_eq!(reopened.tracker.state().items[0].name, "Write");
        assert!(!dir.path().join("remote.db").exists());
    }

    #[test]
    fn test_save_pushes_to_remote_when_user_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), Some("sam"));
        let mut doc = Document::open(&config);
        doc.tracker
            .create_task(TaskDraft::named("Write"), Utc::now())
            .unwrap();
        assert!(doc.save());

        assert!(dir.path().join("state-sam.json").exists());
        let remote = open_remote(&config).unwrap().load_state("sam").unwrap();
        assert_eq!(remote.unwrap().items.len(), 1);
    }

    #[test]
    fn test_open_merges_changes_from_another_device() {
        let shared = tempfile::tempdir().unwrap();
        let laptop_dir = tempfile::tempdir().unwrap();
        let desktop_dir = tempfile::tempdir().unwrap();
        let device = |dir: &tempfile::TempDir| Config {
            database_path: shared.path().join("remote.db"),
            ..config_in(dir.path(), Some("sam"))
        };

        let mut desktop = Document::open(&device(&desktop_dir));
        desktop
            .tracker
            .create_task(TaskDraft::named("FromDesktop"), Utc::now())
            .unwrap();
        assert!(desktop.save());

        let mut laptop = Document::open(&device(&laptop_dir));
        laptop
            .tracker
            .create_task(TaskDraft::named("FromLaptop"), Utc::now())
            .unwrap();
        assert!(laptop.save());

        let remote = open_remote(&device(&laptop_dir))
            .unwrap()
            .load_state("sam")
            .unwrap()
            .unwrap();
        let mut names: Vec<&str> = remote.items.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["FromDesktop", "FromLaptop"]);
    }

    #[test]
    fn test_open_without_remote_document_keeps_local_settings() {
        let dir = tempfile::tempdir().unwrap();
        let local = StateFile::new(dir.path().join("state-sam.json"));
        let mut state = TrackerState::default();
        state.settings.concurrency_mode = tf_core::ConcurrencyMode::Single;
        local.save(&state).unwrap();

        let doc = Document::open(&config_in(dir.path(), Some("sam")));
        assert_eq!(doc.tracker.state().settings, state.settings);
    }

    #[test]
    fn test_open_local_ignores_remote() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), Some("sam"));
        let mut other = TrackerState::default();
        other.settings.display_name = "Elsewhere".to_string();
        open_remote(&config)
            .unwrap()
            .save_state("sam", &other, Utc::now())
            .unwrap();

        assert_eq!(Document::open_local(&config).tracker.state(), &TrackerState::default());
        assert_eq!(Document::open(&config).tracker.state().settings.display_name, "Elsewhere");
    }

    #[test]
    fn test_save_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the document should be makes the rename fail
        std::fs::create_dir_all(dir.path().join("state.json")).unwrap();
        let doc = Document::open(&config_in(dir.path(), None));
        assert!(!doc.save());
    }
}
