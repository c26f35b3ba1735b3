//! Task management commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tf_core::time::format_clock;
use tf_core::{SessionStore, Task, TaskDraft, TimerState, timer};

use crate::cli::{TaskAction, TaskFields, TaskOptions};
use crate::commands::util::{parse_date, resolve_task};
use crate::document::Document;

/// Characters of a task ID shown in listings.
const SHORT_ID: usize = 8;

/// Builds a draft for a new task.
pub fn draft_from(fields: &TaskFields) -> Result<TaskDraft> {
    let mut draft = TaskDraft::named(fields.name.clone());
    apply_options(&mut draft, &fields.options)?;
    Ok(draft)
}

/// Overlays the given options on a draft. An empty `--due` clears the date.
fn apply_options(draft: &mut TaskDraft, options: &TaskOptions) -> Result<()> {
    if let Some(color) = &options.color {
        draft.color = Some(color.clone());
    }
    if let Some(note) = &options.note {
        draft.note = Some(note.clone());
    }
    if let Some(estimate) = &options.estimate {
        draft.estimated_hours = Some(estimate.clone());
    }
    if let Some(due) = options.due.as_deref() {
        draft.due_date = if due.trim().is_empty() {
            None
        } else {
            Some(parse_date(due)?)
        };
    }
    Ok(())
}

/// Draft holding a task's current editable fields.
fn current_draft(task: &Task) -> TaskDraft {
    TaskDraft {
        name: task.name.clone(),
        color: Some(task.color.clone()),
        note: task.note.clone(),
        estimated_hours: task.estimated_hours.clone(),
        due_date: task.due_date,
    }
}

/// Runs a task subcommand. Only mutating actions save.
pub fn run<W: Write>(writer: &mut W, doc: &mut Document, action: &TaskAction) -> Result<()> {
    let now = Utc::now();
    match action {
        TaskAction::Add(fields) => {
            let task = doc
                .tracker
                .create_task(draft_from(fields)?, now)
                .context("failed to create task")?;
            writeln!(writer, "Created task {} '{}'", task.id.short(SHORT_ID), task.name)?;
        }
        TaskAction::Edit { task, name, fields } => {
            let id = resolve_task(doc.tracker.store(), task)?;
            let mut draft = doc
                .tracker
                .store()
                .task(id.as_str())
                .map(current_draft)
                .context("task disappeared")?;
            if let Some(name) = name {
                draft.name.clone_from(name);
            }
            apply_options(&mut draft, fields)?;
            let task = doc
                .tracker
                .update_task(&id, draft, now)
                .context("failed to update task")?;
            writeln!(writer, "Updated task {} '{}'", task.id.short(SHORT_ID), task.name)?;
        }
        TaskAction::Archive { task } => {
            let id = resolve_task(doc.tracker.store(), task)?;
            let discarded = doc.tracker.archive_task(&id, now)?;
            let name = task_name(doc.tracker.store(), id.as_str());
            match discarded {
                Some(ms) => writeln!(
                    writer,
                    "Archived '{name}' (discarded timer at {})",
                    format_clock(ms)
                )?,
                None => writeln!(writer, "Archived '{name}'")?,
            }
        }
        TaskAction::Restore { task } => {
            let id = resolve_task(doc.tracker.store(), task)?;
            doc.tracker.restore_task(&id, now)?;
            writeln!(writer, "Restored '{}'", task_name(doc.tracker.store(), id.as_str()))?;
        }
        TaskAction::Delete { task, yes } => {
            let id = resolve_task(doc.tracker.store(), task)?;
            let name = task_name(doc.tracker.store(), id.as_str()).to_string();
            if !yes {
                anyhow::bail!(
                    "Deleting '{name}' also deletes all of its logs and cannot be undone. Re-run with --yes to confirm."
                );
            }
            let removed = doc.tracker.delete_task_permanently(&id)?;
            writeln!(writer, "Deleted '{name}' and {removed} log(s)")?;
        }
        TaskAction::List { all, json } => {
            let store = doc.tracker.store();
            if *json {
                writeln!(writer, "{}", format_task_json(store, now, *all)?)?;
            } else {
                write!(writer, "{}", format_task_list(store, now, *all))?;
            }
            return Ok(());
        }
        TaskAction::Move { task, target } => {
            let id = resolve_task(doc.tracker.store(), task)?;
            let target = resolve_task(doc.tracker.store(), target)?;
            doc.tracker.reorder_task(&id, &target)?;
            writeln!(
                writer,
                "Moved '{}' to the position of '{}'",
                task_name(doc.tracker.store(), id.as_str()),
                task_name(doc.tracker.store(), target.as_str())
            )?;
        }
    }

    doc.save();
    Ok(())
}

fn task_name<'a>(store: &'a SessionStore, id: &'a str) -> &'a str {
    store.task(id).map_or(id, |t| t.name.as_str())
}

/// Timer clock for a task, if it has a timer.
fn timer_clock(store: &SessionStore, task: &Task, now: DateTime<Utc>) -> Option<i64> {
    match timer::timer_state(store, &task.id) {
        TimerState::Running => store.active_session(&task.id).map(|a| a.total_ms(now)),
        TimerState::Paused => store.paused_ms(&task.id),
        TimerState::Idle => None,
    }
}

/// Tabular task listing in display order.
pub fn format_task_list(store: &SessionStore, now: DateTime<Utc>, include_archived: bool) -> String {
    let tasks: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| include_archived || !t.archived)
        .collect();
    if tasks.is_empty() {
        return "No tasks. Create one with 'tf task add <name>'.\n".to_string();
    }

    let mut out = String::new();
    for task in tasks {
        let state = if task.archived {
            "archived"
        } else {
            timer::timer_state(store, &task.id).as_str()
        };
        let clock = timer_clock(store, task, now).map(format_clock).unwrap_or_default();
        let due = task
            .due_date
            .map(|d| format!("  due {}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        let line = format!(
            "{}  {state:<8}  {:<24}  {clock:>8}{due}",
            task.id.short(SHORT_ID),
            task.name
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonTask<'a> {
    #[serde(flatten)]
    task: &'a Task,
    state: &'static str,
    timer_ms: Option<i64>,
}

/// Task listing as a JSON array.
pub fn format_task_json(store: &SessionStore, now: DateTime<Utc>, include_archived: bool) -> Result<String> {
    let tasks: Vec<JsonTask<'_>> = store
        .tasks()
        .iter()
        .filter(|t| include_archived || !t.archived)
        .map(|task| JsonTask {
            task,
            state: timer::timer_state(store, &task.id).as_str(),
            timer_ms: timer_clock(store, task, now),
        })
        .collect();
    serde_json::to_string_pretty(&tasks).context("failed to serialize tasks")
}
