//! Log commands: add, edit, delete and list completed intervals.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tf_core::time::{format_duration, local_midnight_to_utc};
use tf_core::{LogDraft, LogEntry, LogFilter, SessionStore};

use crate::cli::LogAction;
use crate::commands::util::{local_datetime, local_time, parse_date, parse_datetime, resolve_log, resolve_task};
use crate::document::Document;

const SHORT_ID: usize = 8;

/// Runs a log subcommand. Only mutating actions save.
pub fn run<W: Write>(writer: &mut W, doc: &mut Document, action: &LogAction) -> Result<()> {
    match action {
        LogAction::Add {
            task,
            start,
            end,
            note,
        } => {
            let task_id = resolve_task(doc.tracker.store(), task)?;
            let draft = LogDraft {
                task_id,
                start_at: parse_datetime(start)?,
                end_at: parse_datetime(end)?,
                note: note.clone(),
            };
            let log = doc.tracker.create_log(draft).context("failed to add log")?;
            writeln!(
                writer,
                "Logged {} ({}) as {}",
                format_duration(log.duration_ms()),
                local_datetime(log.start_at),
                log.id.short(SHORT_ID)
            )?;
        }
        LogAction::Edit {
            log,
            task,
            start,
            end,
            note,
        } => {
            let store = doc.tracker.store();
            let id = resolve_log(store, log)?;
            let current = store.log(id.as_str()).context("log disappeared")?;
            let draft = LogDraft {
                task_id: match task {
                    Some(task) => resolve_task(store, task)?,
                    None => current.task_id.clone(),
                },
                start_at: start.as_deref().map_or(Ok(current.start_at), parse_datetime)?,
                end_at: end.as_deref().map_or(Ok(current.end_at), parse_datetime)?,
                note: note.clone().or_else(|| current.note.clone()),
            };
            let log = doc
                .tracker
                .update_log(&id, draft)
                .context("failed to update log")?;
            writeln!(
                writer,
                "Updated log {}: {} ({})",
                log.id.short(SHORT_ID),
                format_duration(log.duration_ms()),
                local_datetime(log.start_at)
            )?;
        }
        LogAction::Delete { log } => {
            let id = resolve_log(doc.tracker.store(), log)?;
            let removed = doc.tracker.delete_log(&id)?;
            writeln!(
                writer,
                "Deleted log {} ({})",
                removed.id.short(SHORT_ID),
                format_duration(removed.duration_ms())
            )?;
        }
        LogAction::List {
            task,
            from,
            to,
            json,
        } => {
            let store = doc.tracker.store();
            let filter = build_filter(
                store,
                task.as_deref(),
                from.as_deref().map(parse_date).transpose()?,
                to.as_deref().map(parse_date).transpose()?,
                &Local,
            )?;
            let logs = store.list_logs(&filter);
            if *json {
                writeln!(writer, "{}", format_logs_json(store, &logs)?)?;
            } else {
                write!(writer, "{}", format_log_list(store, &logs, local_datetime, local_time))?;
            }
            return Ok(());
        }
    }

    doc.save();
    Ok(())
}

/// Resolves list options into a filter over local calendar days.
pub fn build_filter<Tz: TimeZone>(
    store: &SessionStore,
    task: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    tz: &Tz,
) -> Result<LogFilter> {
    Ok(LogFilter {
        task_id: task.map(|t| resolve_task(store, t)).transpose()?,
        from: from.map(|d| local_midnight_to_utc(d, tz)),
        until: to.map(|d| local_midnight_to_utc(d + Duration::days(1), tz)),
    })
}

/// One line per log: id, start, end, duration, task and note.
pub fn format_log_list(
    store: &SessionStore,
    logs: &[&LogEntry],
    show_start: impl Fn(DateTime<Utc>) -> String,
    show_end: impl Fn(DateTime<Utc>) -> String,
) -> String {
    if logs.is_empty() {
        return "No logs.\n".to_string();
    }

    let mut out = String::new();
    for log in logs {
        let task = store
            .task(log.task_id.as_str())
            .map_or("(deleted)", |t| t.name.as_str());
        let note = log.note.as_deref().unwrap_or_default();
        let line = format!(
            "{}  {}-{}  {:>7}  {task:<24}  {note}",
            log.id.short(SHORT_ID),
            show_start(log.start_at),
            show_end(log.end_at),
            format_duration(log.duration_ms())
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonLog<'a> {
    #[serde(flatten)]
    log: &'a LogEntry,
    task_name: Option<&'a str>,
    duration_ms: i64,
}

fn format_logs_json(store: &SessionStore, logs: &[&LogEntry]) -> Result<String> {
    let entries: Vec<JsonLog<'_>> = logs
        .iter()
        .map(|log| JsonLog {
            log,
            task_name: store.task(log.task_id.as_str()).map(|t| t.name.as_str()),
            duration_ms: log.duration_ms(),
        })
        .collect();
    serde_json::to_string_pretty(&entries).context("failed to serialize logs")
}
