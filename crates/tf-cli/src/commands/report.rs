//! Report command for period summaries.

use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tf_core::time::{format_duration, local_date};
use tf_core::{
    ChartSeries, DateSpan, Period, SessionStore, Summary, SummaryQuery, build_chart_series,
    compute_summary,
};

use crate::cli::ReportArgs;
use crate::commands::util::parse_date;

/// Longest task name shown before truncation.
const NAME_WIDTH: usize = 24;

/// Everything a rendered report needs.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub timezone: String,
    pub summary: Summary,
    pub chart: Option<ChartSeries>,
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 || value <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Query ==========

/// Turns command-line options into a summary query.
pub fn build_query(args: &ReportArgs, today: NaiveDate) -> Result<SummaryQuery> {
    let anchor = match args.date.as_deref() {
        Some(date) => parse_date(date)?,
        None => today,
    };

    let period = match args.period {
        Period::Custom { .. } => {
            let span = match (args.from.as_deref(), args.to.as_deref()) {
                (None, None) => None,
                (from, to) => {
                    let first = from.map_or(Ok(today), parse_date)?;
                    let last = to.map_or(Ok(first), parse_date)?;
                    Some(DateSpan::new(first, last)?)
                }
            };
            Period::Custom { span }
        }
        period => {
            if args.from.is_some() || args.to.is_some() {
                anyhow::bail!("--from and --to only apply to --period custom");
            }
            period
        }
    };

    Ok(SummaryQuery {
        period,
        anchor: period.step(anchor, args.offset),
        exclude_archived: args.exclude_archived,
    })
}

/// Computes the report for `query` as of `now`, in the local timezone.
pub fn generate_report_data(
    store: &SessionStore,
    query: &SummaryQuery,
    with_chart: bool,
    now: DateTime<Utc>,
) -> ReportData {
    let summary = compute_summary(store, query, now, &Local);
    let chart = with_chart.then(|| build_chart_series(&summary));
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    ReportData {
        generated_at: now,
        timezone,
        summary,
        chart,
    }
}

// ========== Text Output ==========

fn period_word(period: &Period) -> &'static str {
    match period {
        Period::Day => "day",
        Period::Week => "week",
        Period::Month => "month",
        Period::Year => "year",
        Period::Custom { .. } => "period",
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width - 1).collect();
    short.push('…');
    short
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let summary = &data.summary;
    let mut output = String::new();

    let description = summary.period.describe(summary.range.days());
    writeln!(output, "TIME REPORT: {description}").unwrap();

    let ranked = summary.ranked();
    if ranked.is_empty() {
        writeln!(output).unwrap();
        writeln!(
            output,
            "No time recorded this {}.",
            period_word(&summary.period)
        )
        .unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'tf start <task>' to begin tracking.").unwrap();
        return output;
    }

    // BY TASK section, bars scaled to the largest task
    let max_task = ranked.first().map_or(0, |t| t.duration_ms);
    writeln!(output).unwrap();
    writeln!(output, "BY TASK").unwrap();
    writeln!(output, "───────").unwrap();
    for total in &ranked {
        let name = truncate(&total.name, NAME_WIDTH);
        let duration = format_duration(total.duration_ms);
        let bar = progress_bar(total.duration_ms, max_task);
        let share = total.share_of_total(summary.total_with_overlap).round();
        writeln!(
            output,
            "{name:<NAME_WIDTH$}  {duration:>7}  {bar}  {share:>3}%"
        )
        .unwrap();
    }

    if let Some(chart) = &data.chart {
        let totals = chart.bucket_totals();
        let max_bucket = totals.iter().copied().max().unwrap_or(0);
        writeln!(output).unwrap();
        writeln!(output, "CHART").unwrap();
        writeln!(output, "─────").unwrap();
        for (label, total) in chart.labels.iter().zip(&totals) {
            let bar = progress_bar(*total, max_bucket);
            writeln!(output, "{label:<6}  {bar}  {}", format_duration(*total)).unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(
        output,
        "With overlap:  {}",
        format_duration(summary.total_with_overlap)
    )
    .unwrap();
    writeln!(output, "Actual:        {}", format_duration(summary.total_actual)).unwrap();
    writeln!(output, "Overlap:       {}", format_duration(summary.overlap_ms())).unwrap();

    if summary.segments.iter().any(|s| s.kind.is_live()) {
        writeln!(output).unwrap();
        writeln!(output, "Includes time from running and paused timers.").unwrap();
    }

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub period: JsonPeriod,
    pub by_task: Vec<JsonTaskEntry>,
    pub totals: JsonTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<JsonChart>,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    #[serde(rename = "type")]
    pub period_type: &'static str,
    pub label: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct JsonTaskEntry {
    pub task_id: String,
    pub name: String,
    pub color: String,
    pub duration_ms: i64,
    pub share_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonTotals {
    pub with_overlap_ms: i64,
    pub actual_ms: i64,
    pub overlap_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct JsonChart {
    pub labels: Vec<String>,
    pub series: Vec<JsonSeries>,
}

#[derive(Debug, Serialize)]
pub struct JsonSeries {
    pub task_id: String,
    pub name: String,
    pub values: Vec<i64>,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let summary = &data.summary;
    let name_of = |task_id: &tf_core::TaskId| {
        summary
            .by_task
            .iter()
            .find(|t| &t.task_id == task_id)
            .map_or_else(String::new, |t| t.name.clone())
    };

    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: data.timezone.clone(),
        period: JsonPeriod {
            period_type: summary.period.as_str(),
            label: summary.period.describe(summary.range.days()),
            start: summary.range.first_day.format("%Y-%m-%d").to_string(),
            end: summary.range.last_day.format("%Y-%m-%d").to_string(),
        },
        by_task: summary
            .by_task
            .iter()
            .map(|t| JsonTaskEntry {
                task_id: t.task_id.to_string(),
                name: t.name.clone(),
                color: t.color.clone(),
                duration_ms: t.duration_ms,
                share_pct: (t.share_of_total(summary.total_with_overlap) * 10.0).round() / 10.0,
            })
            .collect(),
        totals: JsonTotals {
            with_overlap_ms: summary.total_with_overlap,
            actual_ms: summary.total_actual,
            overlap_ms: summary.overlap_ms(),
        },
        chart: data.chart.as_ref().map(|chart| JsonChart {
            labels: chart.labels.clone(),
            series: chart
                .series
                .iter()
                .map(|s| JsonSeries {
                    task_id: s.task_id.to_string(),
                    name: name_of(&s.task_id),
                    values: s.values.clone(),
                })
                .collect(),
        }),
    };

    serde_json::to_string_pretty(&report).context("failed to serialize report")
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run(store: &SessionStore, args: &ReportArgs) -> Result<()> {
    let now = Utc::now();
    let query = build_query(args, local_date(now, &Local))?;
    let data = generate_report_data(store, &query, args.chart, now);

    if args.json {
        println!("{}", format_report_json(&data)?);
    } else {
        print!("{}", format_report(&data));
    }

    Ok(())
}
