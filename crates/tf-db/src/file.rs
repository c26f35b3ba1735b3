//! Local JSON document.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tf_core::TrackerState;

use crate::{DbError, Storage};

/// The local state document at a fixed path.
///
/// Separate `tf` processes share the file, so reads take a shared lock and
/// writes an exclusive one on a sibling `.lock` file. Writes go to a
/// temporary file first and are renamed into place.
///
/// Each lock covers a single `load` or `save`, so readers never see a torn
/// document. A load-modify-save sequence is not atomic: when two processes
/// interleave, the later save wins and the other change is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn io_error(&self, source: io::Error) -> DbError {
        DbError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn open_lock(&self) -> Result<File, DbError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(|e| self.io_error(e))
    }

    /// Loads the document. Returns `None` if the file doesn't exist.
    pub fn load(&self) -> Result<Option<TrackerState>, DbError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock).map_err(|e| self.io_error(e))?;

        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Writes the document, replacing any previous version.
    pub fn save(&self, state: &TrackerState) -> Result<(), DbError> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "saved state document");
        Ok(())
    }

    /// Removes the document. Missing files are not an error.
    pub fn remove(&self) -> Result<(), DbError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

impl Storage for StateFile {
    fn load(&self) -> Result<Option<TrackerState>, DbError> {
        Self::load(self)
    }

    fn save(&self, state: &TrackerState) -> Result<(), DbError> {
        Self::save(self, state)
    }
}
