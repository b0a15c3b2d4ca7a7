//! Compare command implementation

use crate::cli::output::format_comparison;
use crate::cli::{init_command_tracing, load_config, CompareArgs};
use crate::dashboard::Dashboard;
use crate::report::ComparisonRow;
use crate::source::SourceKind;
use colored::Colorize;
use serde::Serialize;

/// Sources feeding the comparative view.
pub const COMPARED_SOURCES: [SourceKind; 3] =
    [SourceKind::Fault, SourceKind::Balena, SourceKind::Cleaning];

#[derive(Debug, Serialize)]
pub struct ComparisonView {
    pub rows: Vec<ComparisonRow>,
    /// Sources whose rows came from mock data
    pub mock_sources: Vec<SourceKind>,
}

/// Handle `framewatch compare` command
pub async fn handle_compare(args: &CompareArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config, args.log_level.as_deref())?;
    init_command_tracing(&config);

    let dashboard = Dashboard::from_config(&config)?;
    let view = build_comparison(&dashboard).await;

    if args.json {
        Ok(serde_json::to_string_pretty(&view)?)
    } else {
        Ok(format_comparison_view(&view))
    }
}

/// Refresh the compared sources together and collect their rows.
pub async fn build_comparison(dashboard: &Dashboard) -> ComparisonView {
    let refreshes = COMPARED_SOURCES
        .into_iter()
        .filter(|kind| dashboard.is_enabled(*kind))
        .map(|kind| dashboard.refresh(kind));
    futures::future::join_all(refreshes).await;

    let mock_sources = COMPARED_SOURCES
        .into_iter()
        .filter(|kind| dashboard.is_using_mock_data(*kind))
        .collect();

    ComparisonView {
        rows: dashboard.comparison(),
        mock_sources,
    }
}

pub fn format_comparison_view(view: &ComparisonView) -> String {
    let mut out = format_comparison(&view.rows);
    if !view.mock_sources.is_empty() {
        let names: Vec<&str> = view.mock_sources.iter().map(SourceKind::as_str).collect();
        out.push_str(&format!(
            "\n\n{}",
            format!("Using mock data for: {}", names.join(", ")).yellow()
        ));
    }
    out
}
