//! Import command: replace the document with a `tf export` backup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tf_core::{SessionStore, TrackerState};

use crate::commands::export::EXPORT_VERSION;

#[derive(Debug, Deserialize)]
struct ImportDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(flatten)]
    state: TrackerState,
}

const fn default_version() -> u32 {
    EXPORT_VERSION
}

/// Parses a backup. Unknown newer versions are rejected.
///
/// The result goes through the same repair as a loaded document, so
/// dangling timers or inverted logs in the backup are dropped.
pub fn parse_backup(json: &str) -> Result<TrackerState> {
    let raw: serde_json::Value = serde_json::from_str(json).context("backup is not valid JSON")?;
    for key in ["items", "sessions"] {
        if !raw.get(key).is_some_and(serde_json::Value::is_array) {
            anyhow::bail!("backup has no '{key}' list");
        }
    }

    let doc: ImportDocument = serde_json::from_value(raw).context("backup has an invalid shape")?;
    if doc.version > EXPORT_VERSION {
        anyhow::bail!(
            "backup version {} is newer than supported version {EXPORT_VERSION}",
            doc.version
        );
    }
    Ok(SessionStore::from_state(doc.state).into_state())
}

/// Reads a backup file.
pub fn read_backup(path: &Path) -> Result<TrackerState> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_backup(&json).with_context(|| format!("failed to import {}", path.display()))
}
