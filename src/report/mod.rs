//! Comparative view across the frame pipelines.
//!
//! Flattens the fault, balena and cleaning snapshots into one row per
//! (location, pipeline) pair so the stages can be compared side by side.

use crate::source::{BalenaSnapshot, CleaningSnapshot, FaultSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Server label used for balena rows, which carry no endpoint tag.
pub const BALENA_SERVER_LABEL: &str = "Balena Cache";

/// Which pipeline a comparison row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    Flask,
    Capturing,
    Cleaning,
}

impl Pipeline {
    pub fn label(&self) -> &'static str {
        match self {
            Pipeline::Flask => "5s Frames (Flask)",
            Pipeline::Capturing => "1s Frames (Capturing)",
            Pipeline::Cleaning => "15s Frames (Cleaning)",
        }
    }
}

/// Colour band for a missed-frame percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_percentage(pct: f64) -> Self {
        if pct > 10.0 {
            Severity::Critical
        } else if pct > 5.0 {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub location: String,
    pub pipeline: Pipeline,
    pub first_frame: String,
    pub last_frame: String,
    pub frames_received: u64,
    pub frames_expected: u64,
    pub frames_missed: u64,
    /// Rounded to two decimals
    pub missed_percentage: f64,
    pub server: String,
}

impl ComparisonRow {
    pub fn severity(&self) -> Severity {
        Severity::from_percentage(self.missed_percentage)
    }
}

/// Expected minus received, never negative.
pub fn frames_missed(expected: u64, received: u64) -> u64 {
    expected.saturating_sub(received)
}

/// `part / whole` as a percentage rounded to two decimals; 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

pub fn fault_rows(snapshot: &FaultSnapshot) -> Vec<ComparisonRow> {
    snapshot
        .iter()
        .map(|(location, stats)| {
            let missed = frames_missed(stats.total_frames_expected, stats.total_frames_received);
            ComparisonRow {
                location: location.clone(),
                pipeline: Pipeline::Flask,
                first_frame: stats.first_frame_timestamp.clone(),
                last_frame: stats.last_frame_timestamp.clone(),
                frames_received: stats.total_frames_received,
                frames_expected: stats.total_frames_expected,
                frames_missed: missed,
                missed_percentage: percentage(missed, stats.total_frames_expected),
                server: stats.server_ip.clone().unwrap_or_default(),
            }
        })
        .collect()
}

/// Balena reports delayed rather than missing frames: expected is captured
/// plus delayed, and the percentage is delayed over captured.
pub fn balena_rows(snapshot: &BalenaSnapshot) -> Vec<ComparisonRow> {
    snapshot
        .iter()
        .map(|(location, stats)| ComparisonRow {
            location: location.clone(),
            pipeline: Pipeline::Capturing,
            first_frame: stats.start_timestamp.clone(),
            last_frame: stats.last_frame_timestamp.clone(),
            frames_received: stats.total_1s_frames_captured,
            frames_expected: stats
                .total_1s_frames_captured
                .saturating_add(stats.cache_frames_with_delay_more_than_1s),
            frames_missed: stats.cache_frames_with_delay_more_than_1s,
            missed_percentage: percentage(
                stats.total_delayed_frames,
                stats.total_1s_frames_captured,
            ),
            server: BALENA_SERVER_LABEL.to_string(),
        })
        .collect()
}

pub fn cleaning_rows(snapshot: &CleaningSnapshot) -> Vec<ComparisonRow> {
    snapshot
        .iter()
        .map(|(location, stats)| {
            let missed = frames_missed(stats.total_frames_expected, stats.total_frames_received);
            ComparisonRow {
                location: location.clone(),
                pipeline: Pipeline::Cleaning,
                first_frame: stats.first_frame_timestamp.clone(),
                last_frame: stats.last_frame_timestamp.clone(),
                frames_received: stats.total_frames_received,
                frames_expected: stats.total_frames_expected,
                frames_missed: missed,
                missed_percentage: percentage(missed, stats.total_frames_expected),
                server: stats.server_ip.clone(),
            }
        })
        .collect()
}

/// All rows, flask first, then capturing, then cleaning. Missing snapshots
/// contribute nothing.
pub fn comparison_rows(
    fault: Option<&FaultSnapshot>,
    balena: Option<&BalenaSnapshot>,
    cleaning: Option<&CleaningSnapshot>,
) -> Vec<ComparisonRow> {
    let mut rows = Vec::new();
    if let Some(fault) = fault {
        rows.extend(fault_rows(fault));
    }
    if let Some(balena) = balena {
        rows.extend(balena_rows(balena));
    }
    if let Some(cleaning) = cleaning {
        rows.extend(cleaning_rows(cleaning));
    }
    rows
}

/// Group rows by location, keeping pipeline order within each group.
pub fn group_by_location(rows: Vec<ComparisonRow>) -> BTreeMap<String, Vec<ComparisonRow>> {
    let mut grouped: BTreeMap<String, Vec<ComparisonRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.location.clone()).or_default().push(row);
    }
    grouped
}
