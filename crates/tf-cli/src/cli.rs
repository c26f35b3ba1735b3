//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tf_core::{ConcurrencyMode, Period, WeekStart};

/// Personal time tracker.
///
/// Define tasks, run timers against them (several at once if you like),
/// and review how the time adds up, with and without overlap.
#[derive(Debug, Parser)]
#[command(name = "tf", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskAction),

    /// Start (or resume) a task's timer.
    Start {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Pause a running timer.
    Pause {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Pause a running timer, otherwise start it.
    Toggle {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Finish a running or paused timer and record a log.
    Stop {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Discard a running timer without recording anything.
    Cancel {
        /// Task ID, ID prefix, or name.
        task: String,

        /// Confirm discarding the tracked time.
        #[arg(long)]
        yes: bool,
    },

    /// Manage completed time logs.
    #[command(subcommand)]
    Log(LogAction),

    /// Summarize tracked time for a period.
    Report(ReportArgs),

    /// Show running and paused timers with today/week/month totals.
    Status,

    /// Show live timers until none is running.
    Watch {
        /// Milliseconds between ticks.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many ticks.
        #[arg(long)]
        max_ticks: Option<u32>,
    },

    /// Show or change settings.
    Settings(SettingsArgs),

    /// Write all data as a JSON backup.
    Export {
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a JSON backup.
    Import {
        /// Backup file written by `tf export`.
        file: PathBuf,

        /// Confirm replacing the current data.
        #[arg(long)]
        yes: bool,
    },

    /// Merge the local document with the remote copy and save both.
    Sync {
        /// Remote document owner (defaults to the configured user).
        #[arg(long)]
        user: Option<String>,
    },

    /// Delete all tasks, logs, timers and settings.
    Reset {
        /// Confirm deleting everything.
        #[arg(long)]
        yes: bool,
    },
}

/// Task subcommands.
#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Create a task.
    Add(TaskFields),

    /// Change a task's fields. Omitted fields are left as they are.
    Edit {
        /// Task ID, ID prefix, or name.
        task: String,

        /// New name.
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: TaskOptions,
    },

    /// Archive a task. Its running or paused timer is discarded.
    Archive {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Bring an archived task back.
    Restore {
        /// Task ID, ID prefix, or name.
        task: String,
    },

    /// Permanently delete a task and all of its logs.
    Delete {
        /// Task ID, ID prefix, or name.
        task: String,

        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// List tasks.
    List {
        /// Include archived tasks.
        #[arg(long)]
        all: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Move a task to the position of another task.
    Move {
        /// Task to move.
        task: String,

        /// Task whose position it takes.
        target: String,
    },
}

/// Fields for a new task.
#[derive(Debug, Args)]
pub struct TaskFields {
    /// Task name.
    pub name: String,

    #[command(flatten)]
    pub options: TaskOptions,
}

/// Optional task fields shared by add and edit.
#[derive(Debug, Default, Args)]
pub struct TaskOptions {
    /// Color tag, e.g. "#3B82F6".
    #[arg(long)]
    pub color: Option<String>,

    /// Free-text note.
    #[arg(long)]
    pub note: Option<String>,

    /// Estimated hours, e.g. "2.5".
    #[arg(long)]
    pub estimate: Option<String>,

    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: Option<String>,
}

/// Log subcommands.
#[derive(Debug, Subcommand)]
pub enum LogAction {
    /// Record a completed interval by hand.
    Add {
        /// Task ID, ID prefix, or name.
        task: String,

        /// Start: ISO 8601, local "YYYY-MM-DD HH:MM", or relative ("2 hours ago").
        #[arg(long)]
        start: String,

        /// End, in the same formats as --start.
        #[arg(long)]
        end: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// Change a log. Omitted fields are left as they are.
    Edit {
        /// Log ID or ID prefix.
        log: String,

        /// Move the log to another task.
        #[arg(long)]
        task: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a log.
    Delete {
        /// Log ID or ID prefix.
        log: String,
    },

    /// List logs, newest first.
    List {
        /// Only logs of this task.
        #[arg(long)]
        task: Option<String>,

        /// Only logs starting on or after this local date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Only logs starting on or before this local date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Report options.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Aggregation period: day, week, month, year or custom.
    #[arg(short, long, default_value = "week")]
    pub period: Period,

    /// Reference date (YYYY-MM-DD), defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    /// Shift the period by this many steps (negative for the past).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i32,

    /// First day of a custom period (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of a custom period (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,

    /// Leave archived tasks out.
    #[arg(long)]
    pub exclude_archived: bool,

    /// Include the per-day bar chart.
    #[arg(long)]
    pub chart: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Settings changes. With no flags, prints the current settings.
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Concurrency mode: single or multi.
    #[arg(long)]
    pub mode: Option<ConcurrencyMode>,

    /// Maximum concurrently running timers in multi mode.
    #[arg(long)]
    pub max_concurrent: Option<u32>,

    /// First day of the week: monday or sunday.
    #[arg(long)]
    pub week_start: Option<WeekStart>,

    /// Display name.
    #[arg(long)]
    pub name: Option<String>,

    /// Whether finishing a timer archives its task.
    #[arg(long)]
    pub archive_on_finish: Option<bool>,
}
