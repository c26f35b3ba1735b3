//! Bar chart data: one bucket per day (per month for years), one series per task.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::period::Period;
use crate::summary::Summary;
use crate::types::TaskId;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Milliseconds per bucket for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSeries {
    pub task_id: TaskId,
    pub values: Vec<i64>,
}

impl TaskSeries {
    pub fn total_ms(&self) -> i64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    /// Tasks with a non-zero bucket, in display order.
    pub series: Vec<TaskSeries>,
}

impl ChartSeries {
    /// Sum of all series per bucket.
    pub fn bucket_totals(&self) -> Vec<i64> {
        let mut totals = vec![0; self.labels.len()];
        for series in &self.series {
            for (total, value) in totals.iter_mut().zip(&series.values) {
                *total += value;
            }
        }
        totals
    }
}

/// Buckets a summary's segments by calendar offset within its period.
pub fn build_chart_series(summary: &Summary) -> ChartSeries {
    let first = summary.range.first_day;
    let labels = labels(&summary.period, first, summary.range.day_count());

    let series = summary
        .by_task
        .iter()
        .filter_map(|total| {
            let mut values = vec![0_i64; labels.len()];
            for segment in summary.segments.iter().filter(|s| s.task_id == total.task_id) {
                if let Some(slot) = bucket_index(&summary.period, first, segment.date)
                    .and_then(|i| values.get_mut(i))
                {
                    *slot += segment.duration_ms();
                }
            }
            values.iter().any(|v| *v > 0).then(|| TaskSeries {
                task_id: total.task_id.clone(),
                values,
            })
        })
        .collect();

    ChartSeries { labels, series }
}

fn labels(period: &Period, first: NaiveDate, day_count: i64) -> Vec<String> {
    let days = || (0..day_count).map(move |i| first + Duration::days(i));
    match period {
        Period::Day => vec![first.format("%b %-d").to_string()],
        Period::Week => days().map(|d| d.format("%a").to_string()).collect(),
        Period::Month => days().map(|d| d.day().to_string()).collect(),
        Period::Year => MONTH_LABELS.iter().map(ToString::to_string).collect(),
        Period::Custom { .. } => days().map(|d| d.format("%-m/%-d").to_string()).collect(),
    }
}

fn bucket_index(period: &Period, first: NaiveDate, date: NaiveDate) -> Option<usize> {
    match period {
        Period::Day => Some(0),
        Period::Year => usize::try_from(date.month0()).ok(),
        Period::Week | Period::Month | Period::Custom { .. } => {
            usize::try_from((date - first).num_days()).ok()
        }
    }
}
