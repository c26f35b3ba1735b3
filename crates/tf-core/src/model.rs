//! Persisted data model.
//!
//! These are the plain records a storage collaborator serializes. Field names
//! follow the document layout (`items`, `sessions`, `activeSessions`,
//! `pausedSessions`, `settings`) so existing exports stay readable.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ConcurrencyMode, LogId, TaskId, ValidationError, WeekStart};

/// Palette offered to new tasks when no color is given.
pub const COLORS: [&str; 8] = [
    "#3B82F6", "#8B5CF6", "#10B981", "#EC4899", "#F59E0B", "#EF4444", "#6366F1", "#14B8A6",
];

/// Default limit for concurrently running timers.
pub const DEFAULT_MAX_CONCURRENT: u32 = 10;

/// A trackable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Free-text estimate, e.g. "2.5".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Last modification; reconciliation keeps the most recent copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable task fields, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub color: Option<String>,
    pub note: Option<String>,
    pub estimated_hours: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Draft with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trims text fields and rejects an empty name.
    pub(crate) fn normalized(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "task name" });
        }
        Ok(Self {
            name,
            color: non_blank(self.color),
            note: non_blank(self.note),
            estimated_hours: non_blank(self.estimated_hours),
            due_date: self.due_date,
        })
    }
}

/// Older documents store an unset due date as `""`.
fn blank_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A completed work interval (log entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogId,
    #[serde(rename = "itemId")]
    pub task_id: TaskId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LogEntry {
    pub fn duration_ms(&self) -> i64 {
        (self.end_at - self.start_at).num_milliseconds()
    }
}

/// Editable log fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDraft {
    pub task_id: TaskId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl LogDraft {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.end_at <= self.start_at {
            return Err(ValidationError::InvalidInterval {
                start: self.start_at,
                end: self.end_at,
            });
        }
        Ok(())
    }
}

/// A currently running timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    #[serde(rename = "itemId")]
    pub task_id: TaskId,
    /// Start of the current run segment.
    pub start_at: DateTime<Utc>,
    /// Time carried over from earlier pauses of the same work period.
    #[serde(default)]
    pub accumulated_ms: i64,
}

impl ActiveSession {
    /// Total tracked time at `now`, including carried-over time.
    pub fn total_ms(&self, now: DateTime<Utc>) -> i64 {
        self.accumulated_ms.max(0) + crate::time::elapsed_ms(self.start_at, now)
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub concurrency_mode: ConcurrencyMode,
    pub max_concurrent: u32,
    pub week_starts_on: WeekStart,
    pub display_name: String,
    /// Whether finishing a timer also archives its task.
    pub archive_on_finish: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            week_starts_on: WeekStart::default(),
            display_name: String::new(),
            archive_on_finish: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent == 0 {
            return Err(ValidationError::InvalidMaxConcurrent {
                value: self.max_concurrent,
            });
        }
        Ok(())
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerState {
    /// Tasks, in display order.
    pub items: Vec<Task>,
    pub sessions: Vec<LogEntry>,
    pub active_sessions: Vec<ActiveSession>,
    /// Task ID to accumulated milliseconds.
    pub paused_sessions: BTreeMap<TaskId, i64>,
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_document_loads_defaults() {
        let state: TrackerState = serde_json::from_str("{}").unwrap();
        assert!(state.items.is_empty());
        assert_eq!(state.settings, Settings::default());
        assert_eq!(state.settings.max_concurrent, 10);
        assert!(state.settings.archive_on_finish);
    }

    #[test]
    fn partial_settings_fill_missing_keys() {
        let settings: Settings =
            serde_json::from_str(r#"{"concurrencyMode":"single","taskCardHeight":300}"#).unwrap();
        assert_eq!(settings.concurrency_mode, ConcurrencyMode::Single);
        assert_eq!(settings.week_starts_on, WeekStart::Monday);
        assert_eq!(settings.max_concurrent, DEFAULT_MAX_CONCURRENT);
    }

    #[test]
    fn document_uses_camel_case_keys() {
        let json = r##"{
            "items": [{"id": "t1", "name": "Write", "color": "#3B82F6", "createdAt": "2025-01-29T09:00:00Z"}],
            "sessions": [{"id": "s1", "itemId": "t1", "startAt": "2025-01-29T09:00:00.000Z", "endAt": "2025-01-29T10:00:00.000Z", "note": ""}],
            "activeSessions": [{"itemId": "t1", "startAt": "2025-01-29T11:00:00Z", "accumulatedMs": 1500}],
            "pausedSessions": {},
            "settings": {"weekStartsOn": "sunday"}
        }"##;
        let state: TrackerState = serde_json::from_str(json).unwrap();
        assert_eq!(state.items[0].id.as_str(), "t1");
        assert_eq!(state.sessions[0].duration_ms(), 3_600_000);
        assert_eq!(state.active_sessions[0].accumulated_ms, 1500);
        assert_eq!(state.settings.week_starts_on, WeekStart::Sunday);

        let out = serde_json::to_value(&state).unwrap();
        assert!(out.get("activeSessions").is_some());
        assert_eq!(out["sessions"][0]["itemId"], "t1");
    }

    #[test]
    fn blank_due_date_reads_as_none() {
        let json = r##"{"id":"t1","name":"Write","color":"#fff","dueDate":"","createdAt":"2025-01-29T09:00:00Z"}"##;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date, None);

        let json = r##"{"id":"t1","name":"Write","color":"#fff","dueDate":"2025-02-01","createdAt":"2025-01-29T09:00:00Z"}"##;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 2, 1));
    }

    #[test]
    fn active_session_total_includes_carry_over() {
        let start = Utc.with_ymd_and_hms(2025, 1, 29, 9, 0, 0).unwrap();
        let active = ActiveSession {
            task_id: TaskId::new("t1").unwrap(),
            start_at: start,
            accumulated_ms: 60_000,
        };
        let now = start + chrono::Duration::minutes(2);
        assert_eq!(active.total_ms(now), 180_000);
        // Clock skew never yields negative elapsed time
        assert_eq!(active.total_ms(start - chrono::Duration::minutes(1)), 60_000);
    }

    #[test]
    fn draft_normalization_trims_and_rejects_blank_names() {
        let draft = TaskDraft {
            name: "  Review  ".to_string(),
            note: Some("   ".to_string()),
            ..TaskDraft::default()
        };
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.name, "Review");
        assert_eq!(normalized.note, None);
        assert!(TaskDraft::named("   ").normalized().is_err());
    }

    #[test]
    fn settings_reject_zero_capacity() {
        let settings = Settings {
            max_concurrent: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
