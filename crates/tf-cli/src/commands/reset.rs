//! Reset command.

use anyhow::Result;

use crate::document::Document;

/// Wipes every task, log, timer and setting.
///
/// With a user configured the emptied document is pushed to the remote copy too.
pub fn run(doc: &mut Document, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("This deletes all tasks, logs and settings. Re-run with --yes to confirm.");
    }
    doc.tracker.reset();
    doc.save();
    tracing::info!("tracker reset");
    Ok(())
}
