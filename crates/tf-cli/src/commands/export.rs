//! Implementation of the `tf export` command.
//!
//! Writes the whole document as a versioned JSON backup that `tf import`
//! reads back.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tf_core::TrackerState;

/// Backup format version written by this build.
pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    version: u32,
    exported_at: String,
    #[serde(flatten)]
    state: &'a TrackerState,
}

/// Serializes `state` as a backup document.
pub fn export_json(state: &TrackerState, exported_at: DateTime<Utc>) -> Result<String> {
    let doc = ExportDocument {
        version: EXPORT_VERSION,
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        state,
    };
    serde_json::to_string_pretty(&doc).context("failed to serialize backup")
}

/// Writes the backup to `output`, or to `writer` when no path is given.
pub fn run<W: Write>(writer: &mut W, state: &TrackerState, output: Option<&Path>) -> Result<()> {
    let json = export_json(state, Utc::now())?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported {} tasks and {} logs to {}", state.items.len(), state.sessions.len(), path.display());
        }
        None => writeln!(writer, "{json}")?,
    }
    Ok(())
}
