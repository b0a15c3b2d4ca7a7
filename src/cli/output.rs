//! Output formatting helpers for CLI commands

use crate::refresh::{RefreshOutcome, RefreshPhase, RefreshState};
use crate::report::{self, ComparisonRow, Severity};
use crate::source::{
    BalenaSnapshot, CleaningSnapshot, FaultCounts, FaultSnapshot, OnboardingSheet, SourceKind,
    TimelinePoint,
};
use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

/// View model for a source's refresh status
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatusView {
    pub source: SourceKind,
    pub phase: RefreshPhase,
    pub is_using_mock_data: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Message for the last refresh call, if it produced one
    pub message: Option<String>,
}

impl SourceStatusView {
    pub fn new<D>(source: SourceKind, state: &RefreshState<D>, outcome: &RefreshOutcome) -> Self {
        Self {
            source,
            phase: state.phase,
            is_using_mock_data: state.is_using_mock_data,
            error: state.error.clone(),
            last_updated: state.last_updated,
            message: outcome.message(),
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn colored_percentage(pct: f64) -> String {
    let text = format!("{:.2}%", pct);
    match Severity::from_percentage(pct) {
        Severity::Critical => text.red().bold().to_string(),
        Severity::Warning => text.yellow().bold().to_string(),
        Severity::Ok => text.green().bold().to_string(),
    }
}

/// One-line summary such as `cleaning: success (updated 10:42:01 UTC)`.
pub fn format_status_line(status: &SourceStatusView) -> String {
    let phase = match status.phase {
        RefreshPhase::Idle => "idle".dimmed().to_string(),
        RefreshPhase::Loading => "loading".cyan().to_string(),
        RefreshPhase::Success => "success".green().to_string(),
        RefreshPhase::MockFallback => "mock data".yellow().to_string(),
        RefreshPhase::Error => "error".red().to_string(),
    };

    let mut line = format!("{}: {}", status.source.as_str().bold(), phase);
    if let Some(updated) = status.last_updated {
        line.push_str(&format!(" (updated {})", updated.format("%H:%M:%S UTC")));
    }
    if let Some(message) = &status.message {
        line.push_str(&format!("\n  {}", message));
    }
    if status.is_using_mock_data {
        if let Some(error) = &status.error {
            line.push_str(&format!("\n  {}", error.dimmed()));
        }
    }
    line
}

pub fn format_fault_table(snapshot: &FaultSnapshot) -> String {
    let mut table = new_table(vec![
        "Location",
        "First Frame",
        "Last Frame",
        "5s Delay",
        "10s Delay",
        "15s Delay",
        "Received",
        "Expected",
        "Missed %",
        "Server",
    ]);

    for (location, stats) in snapshot {
        let missed = report::frames_missed(stats.total_frames_expected, stats.total_frames_received);
        table.add_row(vec![
            Cell::new(location),
            Cell::new(&stats.first_frame_timestamp),
            Cell::new(&stats.last_frame_timestamp),
            Cell::new(stats.frames_with_5s_delay),
            Cell::new(stats.frames_with_10s_delay),
            Cell::new(stats.frames_with_15s_delay),
            Cell::new(stats.total_frames_received),
            Cell::new(stats.total_frames_expected),
            Cell::new(colored_percentage(report::percentage(
                missed,
                stats.total_frames_expected,
            ))),
            Cell::new(stats.server_ip.as_deref().unwrap_or("-")),
        ]);
    }

    table.to_string()
}

pub fn format_cleaning_table(snapshot: &CleaningSnapshot) -> String {
    let mut table = new_table(vec![
        "Location",
        "First Frame",
        "Last Frame",
        "10s Delay",
        "15s Delay",
        "20s Delay",
        "Received",
        "Expected",
        "Missed %",
        "Server",
    ]);

    for (location, stats) in snapshot {
        let missed = report::frames_missed(stats.total_frames_expected, stats.total_frames_received);
        table.add_row(vec![
            Cell::new(location),
            Cell::new(&stats.first_frame_timestamp),
            Cell::new(&stats.last_frame_timestamp),
            Cell::new(stats.frames_with_10s_delay),
            Cell::new(stats.frames_with_15s_delay),
            Cell::new(stats.frames_with_20s_delay),
            Cell::new(stats.total_frames_received),
            Cell::new(stats.total_frames_expected),
            Cell::new(colored_percentage(report::percentage(
                missed,
                stats.total_frames_expected,
            ))),
            Cell::new(&stats.server_ip),
        ]);
    }

    table.to_string()
}

pub fn format_balena_table(snapshot: &BalenaSnapshot) -> String {
    let mut table = new_table(vec![
        "Location",
        "Start",
        "Last Frame",
        "1s Frames",
        "Delayed",
        "Delayed %",
        "Reconnects",
        "Avg Delay",
    ]);

    for (location, stats) in snapshot {
        table.add_row(vec![
            Cell::new(location),
            Cell::new(&stats.start_timestamp),
            Cell::new(&stats.last_frame_timestamp),
            Cell::new(stats.total_1s_frames_captured),
            Cell::new(stats.total_delayed_frames),
            Cell::new(colored_percentage(report::percentage(
                stats.total_delayed_frames,
                stats.total_1s_frames_captured,
            ))),
            Cell::new(stats.total_reconnect_instances),
            Cell::new(format!("{:.2}s", stats.weighted_avg_delay)),
        ]);
    }

    table.to_string()
}

/// Latest counts per location, plus how many samples the timeline holds.
pub fn format_fault_counts_table(counts: &FaultCounts, samples: usize) -> String {
    let mut table = new_table(vec!["Location", "5s Faults", "10s Faults"]);

    let locations: std::collections::BTreeSet<&String> = counts
        .fault_count_5s
        .keys()
        .chain(counts.fault_count_10s.keys())
        .collect();
    for location in locations {
        table.add_row(vec![
            Cell::new(location),
            Cell::new(counts.fault_count_5s.get(location).copied().unwrap_or(0)),
            Cell::new(counts.fault_count_10s.get(location).copied().unwrap_or(0)),
        ]);
    }

    format!(
        "{}\nAs of {} ({} samples in timeline)",
        table, counts.timestamp, samples
    )
}

/// Rows needing attention are shown in red.
pub fn format_onboarding_table(sheet: &OnboardingSheet) -> String {
    let mut table = new_table(sheet.headers.iter().map(String::as_str).collect());

    for row in &sheet.rows {
        let highlighted = row.is_highlighted();
        table.add_row(sheet.headers.iter().map(|header| {
            let value = row.get(header).unwrap_or("");
            if highlighted {
                Cell::new(value.red().to_string())
            } else {
                Cell::new(value)
            }
        }));
    }

    let flagged = sheet.rows.iter().filter(|r| r.is_highlighted()).count();
    format!("{}\n{} of {} centers need attention", table, flagged, sheet.rows.len())
}

/// One table per location, pipelines in flask, capturing, cleaning order.
pub fn format_comparison(rows: &[ComparisonRow]) -> String {
    if rows.is_empty() {
        return "No data available".to_string();
    }

    let grouped = report::group_by_location(rows.to_vec());
    let mut sections = Vec::with_capacity(grouped.len());

    for (location, items) in grouped {
        let mut table = new_table(vec![
            "Type",
            "First Frame",
            "Last Frame",
            "Received",
            "Expected",
            "Missed",
            "Missed %",
            "Server",
        ]);
        for item in &items {
            table.add_row(vec![
                Cell::new(item.pipeline.label()),
                Cell::new(&item.first_frame),
                Cell::new(&item.last_frame),
                Cell::new(item.frames_received),
                Cell::new(item.frames_expected),
                Cell::new(item.frames_missed),
                Cell::new(colored_percentage(item.missed_percentage)),
                Cell::new(&item.server),
            ]);
        }
        sections.push(format!("{}\n{}", location.bold(), table));
    }

    sections.join("\n\n")
}

pub fn format_timeline_json(points: &[TimelinePoint]) -> serde_json::Value {
    serde_json::json!({ "points": points })
}
