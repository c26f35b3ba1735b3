//! Settings command.

use std::io::Write;

use anyhow::{Context, Result};
use tf_core::Settings;

use crate::cli::SettingsArgs;
use crate::document::Document;

/// Whether any change was requested.
const fn has_changes(args: &SettingsArgs) -> bool {
    args.mode.is_some()
        || args.max_concurrent.is_some()
        || args.week_start.is_some()
        || args.name.is_some()
        || args.archive_on_finish.is_some()
}

/// Applies the requested changes to a copy of `current`.
pub fn apply(current: &Settings, args: &SettingsArgs) -> Settings {
    let mut settings = current.clone();
    if let Some(mode) = args.mode {
        settings.concurrency_mode = mode;
    }
    if let Some(max) = args.max_concurrent {
        settings.max_concurrent = max;
    }
    if let Some(start) = args.week_start {
        settings.week_starts_on = start;
    }
    if let Some(name) = &args.name {
        settings.display_name = name.trim().to_string();
    }
    if let Some(archive) = args.archive_on_finish {
        settings.archive_on_finish = archive;
    }
    settings
}

pub fn format_settings(settings: &Settings) -> String {
    let name = if settings.display_name.is_empty() {
        "(none)"
    } else {
        settings.display_name.as_str()
    };
    format!(
        "concurrency_mode   {}\nmax_concurrent     {}\nweek_starts_on     {}\ndisplay_name       {name}\narchive_on_finish  {}\n",
        settings.concurrency_mode.as_str(),
        settings.max_concurrent,
        settings.week_starts_on.as_str(),
        settings.archive_on_finish
    )
}

pub fn run<W: Write>(writer: &mut W, doc: &mut Document, args: &SettingsArgs) -> Result<()> {
    if has_changes(args) {
        let settings = apply(doc.tracker.store().settings(), args);
        doc.tracker
            .update_settings(settings)
            .context("invalid settings")?;
        doc.save();
    }
    write!(writer, "{}", format_settings(doc.tracker.store().settings()))?;
    Ok(())
}
