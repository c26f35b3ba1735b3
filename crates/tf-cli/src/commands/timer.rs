//! Timer commands: `tf start|pause|toggle|stop|cancel`.

use anyhow::{Context, Result};
use chrono::Utc;
use tf_core::time::format_clock;
use tf_core::{SessionStore, TaskId, TimerEvent};

use crate::commands::util::resolve_task;
use crate::document::Document;

/// Which transition to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Toggle,
    Stop,
    Cancel,
}

impl TimerAction {
    const fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Toggle => "toggle",
            Self::Stop => "stop",
            Self::Cancel => "cancel",
        }
    }
}

/// Runs a timer command.
///
/// A refused transition leaves the document untouched and is returned as an error.
pub fn run(doc: &mut Document, action: TimerAction, task: &str) -> Result<()> {
    let task_id = resolve_task(doc.tracker.store(), task)?;
    let now = Utc::now();

    let tracker = &mut doc.tracker;
    let result = match action {
        TimerAction::Start => tracker.start_timer(&task_id, now),
        TimerAction::Pause => tracker.pause_timer(&task_id, now),
        TimerAction::Toggle => tracker.toggle_timer(&task_id, now),
        TimerAction::Stop => tracker.finish_timer(&task_id, now),
        TimerAction::Cancel => tracker.cancel_timer(&task_id, now),
    };
    let event = result.with_context(|| {
        format!(
            "cannot {} '{}'",
            action.verb(),
            task_name(doc.tracker.store(), &task_id)
        )
    })?;

    doc.save();
    print!("{}", describe_event(doc.tracker.store(), &event));
    Ok(())
}

fn task_name<'a>(store: &'a SessionStore, task_id: &'a TaskId) -> &'a str {
    store
        .task(task_id.as_str())
        .map_or(task_id.as_str(), |t| t.name.as_str())
}

/// One line per effect of a transition.
pub fn describe_event(store: &SessionStore, event: &TimerEvent) -> String {
    let name = task_name(store, event.task_id());
    match event {
        TimerEvent::Started {
            resumed_ms,
            auto_paused,
            ..
        } => {
            let mut out = String::new();
            for (other, ms) in auto_paused {
                out.push_str(&format!(
                    "Paused '{}' at {}\n",
                    task_name(store, other),
                    format_clock(*ms)
                ));
            }
            if *resumed_ms > 0 {
                out.push_str(&format!(
                    "Resumed '{name}' at {}\n",
                    format_clock(*resumed_ms)
                ));
            } else {
                out.push_str(&format!("Started '{name}'\n"));
            }
            out
        }
        TimerEvent::Paused { accumulated_ms, .. } => {
            format!("Paused '{name}' at {}\n", format_clock(*accumulated_ms))
        }
        TimerEvent::Finished {
            total_ms,
            log,
            archived,
            ..
        } => {
            let recorded = if log.is_some() {
                format!("{} logged", format_clock(*total_ms))
            } else {
                "nothing to log".to_string()
            };
            let suffix = if *archived { " (archived)" } else { "" };
            format!("Finished '{name}': {recorded}{suffix}\n")
        }
        TimerEvent::Cancelled { discarded_ms, .. } => {
            format!(
                "Cancelled '{name}', discarded {}\n",
                format_clock(*discarded_ms)
            )
        }
    }
}
