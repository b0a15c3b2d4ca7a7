//! Fetch command implementation

use crate::cli::output::{
    format_balena_table, format_cleaning_table, format_fault_counts_table, format_fault_table,
    format_onboarding_table, format_status_line, format_timeline_json, SourceStatusView,
};
use crate::cli::{init_command_tracing, load_config, FetchArgs};
use crate::dashboard::Dashboard;
use crate::refresh::{RefreshHook, RefreshOutcome};
use crate::source::{timeline_points, SourceKind, TelemetrySource};
use serde::Serialize;

/// Handle `framewatch fetch` command
pub async fn handle_fetch(args: &FetchArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config, args.log_level.as_deref())?;
    if args.no_mock {
        config.sources.overrides_mut(args.source).mock_fallback = Some(false);
    }
    init_command_tracing(&config);

    let dashboard = Dashboard::from_config(&config)?;
    fetch_source(&dashboard, args.source, args.json).await
}

/// Refresh one source of `dashboard` and render the result.
pub async fn fetch_source(
    dashboard: &Dashboard,
    kind: SourceKind,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    if !dashboard.is_enabled(kind) {
        return Err(format!("source '{}' is disabled in configuration", kind).into());
    }

    let outcome = dashboard.refresh(kind).await;
    if let RefreshOutcome::Failed { reason } = &outcome {
        return Err(format!("{} fetch failed: {}", kind, reason).into());
    }

    match kind {
        SourceKind::Fault => render(&dashboard.fault, &outcome, json, None, format_fault_table),
        SourceKind::FaultTimeline => {
            let history = dashboard.fault_timeline.history();
            let timeline = format_timeline_json(&timeline_points(&history));
            render(
                &dashboard.fault_timeline,
                &outcome,
                json,
                Some(timeline),
                |counts| format_fault_counts_table(counts, history.len()),
            )
        }
        SourceKind::Balena => render(&dashboard.balena, &outcome, json, None, format_balena_table),
        SourceKind::Cleaning => {
            render(&dashboard.cleaning, &outcome, json, None, format_cleaning_table)
        }
        SourceKind::Onboarding => render(
            &dashboard.onboarding,
            &outcome,
            json,
            None,
            format_onboarding_table,
        ),
    }
}

fn render<S>(
    hook: &RefreshHook<S>,
    outcome: &RefreshOutcome,
    json: bool,
    timeline: Option<serde_json::Value>,
    table: impl FnOnce(&S::Snapshot) -> String,
) -> Result<String, Box<dyn std::error::Error>>
where
    S: TelemetrySource,
    S::Snapshot: Serialize,
{
    let state = hook.state();
    let status = SourceStatusView::new(hook.kind(), &state, outcome);

    if json {
        let mut body = serde_json::json!({
            "status": status,
            "data": state.data,
        });
        if let Some(timeline) = timeline {
            body["timeline"] = timeline;
        }
        return Ok(serde_json::to_string_pretty(&body)?);
    }

    let mut out = format_status_line(&status);
    if let Some(data) = &state.data {
        out.push('\n');
        out.push_str(&table(data));
    }
    Ok(out)
}
