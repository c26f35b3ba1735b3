//! Aggregation periods and their resolution into concrete time ranges.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::time::{
    add_months, day_after_midnight, local_midnight_to_utc, month_end, month_start, week_start,
};
use crate::types::{ValidationError, WeekStart};

/// An inclusive span of local calendar days, used by custom periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    first: NaiveDate,
    last: NaiveDate,
}

impl DateSpan {
    /// Creates a span; `last` must not precede `first`.
    pub fn new(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        if last < first {
            return Err(ValidationError::InvalidDateSpan {
                start: first,
                end: last,
            });
        }
        Ok(Self { first, last })
    }

    pub const fn first(&self) -> NaiveDate {
        self.first
    }

    pub const fn last(&self) -> NaiveDate {
        self.last
    }
}

/// Aggregation window anchored to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
    /// Explicit day span. `None` means no dates were chosen yet; it covers today.
    Custom { span: Option<DateSpan> },
}

impl Period {
    /// Short name used on the command line and in JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::Custom { .. } => "custom",
        }
    }

    /// Resolves the local day span this period covers around `anchor`.
    ///
    /// A custom period without dates covers `today`.
    pub fn days(&self, anchor: NaiveDate, today: NaiveDate, start: WeekStart) -> DateSpan {
        let (first, last) = match self {
            Self::Day => (anchor, anchor),
            Self::Week => {
                let first = week_start(anchor, start);
                (first, first.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX))
            }
            Self::Month => (month_start(anchor), month_end(anchor)),
            Self::Year => {
                let first = anchor.with_ordinal(1).unwrap_or(anchor);
                let last = NaiveDate::from_ymd_opt(anchor.year(), 12, 31).unwrap_or(anchor);
                (first, last)
            }
            Self::Custom { span: Some(span) } => (span.first, span.last),
            Self::Custom { span: None } => (today, today),
        };
        DateSpan { first, last }
    }

    /// Resolves the half-open UTC range `[start, end)` for this period.
    pub fn range<Tz: TimeZone>(
        &self,
        anchor: NaiveDate,
        today: NaiveDate,
        start: WeekStart,
        tz: &Tz,
    ) -> TimeRange {
        let days = self.days(anchor, today, start);
        TimeRange {
            start: local_midnight_to_utc(days.first, tz),
            end: day_after_midnight(days.last, tz),
            first_day: days.first,
            last_day: days.last,
        }
    }

    /// Moves the anchor one period forward (`direction > 0`) or backward.
    ///
    /// Custom periods have no natural step and keep their anchor.
    pub fn step(&self, anchor: NaiveDate, direction: i32) -> NaiveDate {
        match self {
            Self::Day => shift_days(anchor, i64::from(direction)),
            Self::Week => shift_days(anchor, 7 * i64::from(direction)),
            Self::Month => add_months(anchor, direction),
            Self::Year => add_months(anchor, 12 * direction),
            Self::Custom { .. } => anchor,
        }
    }

    /// Human-readable description of the resolved span, e.g. "Week of Jan 27, 2025".
    pub fn describe(&self, days: DateSpan) -> String {
        match self {
            Self::Day => days.first.format("%A, %b %-d, %Y").to_string(),
            Self::Week => format!("Week of {}", days.first.format("%b %-d, %Y")),
            Self::Month => days.first.format("%B %Y").to_string(),
            Self::Year => days.first.format("%Y").to_string(),
            Self::Custom { .. } => format!(
                "{} - {}",
                days.first.format("%b %-d, %Y"),
                days.last.format("%b %-d, %Y")
            ),
        }
    }
}

/// Moves `date` by `days`, keeping it when the result is out of range.
fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "custom" => Ok(Self::Custom { span: None }),
            _ => Err(ValidationError::InvalidPeriod {
                value: s.to_string(),
            }),
        }
    }
}

/// A resolved period: UTC bounds plus the local days they cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// Inclusive start (local midnight of `first_day`).
    pub start: DateTime<Utc>,
    /// Exclusive end (local midnight after `last_day`).
    pub end: DateTime<Utc>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl TimeRange {
    /// Whether `[start, end)` intersects this range.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// Number of local calendar days covered (inclusive).
    pub fn day_count(&self) -> i64 {
        (self.last_day - self.first_day).num_days() + 1
    }

    /// The covered days as a [`DateSpan`].
    pub const fn days(&self) -> DateSpan {
        DateSpan {
            first: self.first_day,
            last: self.last_day,
        }
    }
}
