//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A log interval must end strictly after it starts.
    #[error("end ({end}) must be after start ({start})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A date span whose last day precedes its first day.
    #[error("range end {end} is before range start {start}")]
    InvalidDateSpan {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// The concurrent timer limit must allow at least one timer.
    #[error("max concurrent timers must be at least 1, got {value}")]
    InvalidMaxConcurrent { value: u32 },

    /// Invalid concurrency mode value.
    #[error("invalid concurrency mode: {value} (expected single or multi)")]
    InvalidConcurrencyMode { value: String },

    /// Invalid week start value.
    #[error("invalid week start: {value} (expected monday or sunday)")]
    InvalidWeekStart { value: String },

    /// Invalid period value.
    #[error("invalid period: {value} (expected day, week, month, year or custom)")]
    InvalidPeriod { value: String },
}

/// How many timers may run at once.
///
/// This enum encodes the valid modes, preventing invalid string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Starting a task pauses whichever task is running.
    Single,
    /// Up to `maxConcurrent` tasks run side by side.
    #[default]
    Multi,
}

impl ConcurrencyMode {
    /// String representation used in the persisted document.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConcurrencyMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            _ => Err(ValidationError::InvalidConcurrencyMode {
                value: s.to_string(),
            }),
        }
    }
}

/// First day of the week for week periods and week charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// String representation used in the persisted document.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Sunday => "sunday",
        }
    }

    /// The chrono weekday this convention starts on.
    #[must_use]
    pub const fn weekday(self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WeekStart {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Self::Monday),
            "sunday" => Ok(Self::Sunday),
            _ => Err(ValidationError::InvalidWeekStart {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Generates a fresh random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the first `n` characters, for compact display.
            pub fn short(&self, n: usize) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(n)
                    .map_or(self.0.len(), |(idx, _)| idx);
                &self.0[..end]
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated task identifier.
    ///
    /// Task IDs must be non-empty and are never reused once assigned.
    TaskId, "task ID"
);

define_string_id!(
    /// A validated log (completed session) identifier.
    LogId, "log ID"
);
