//! Watch command implementation

use crate::cli::output::{format_status_line, SourceStatusView};
use crate::cli::{init_command_tracing, load_config, WatchArgs};
use crate::dashboard::Dashboard;
use crate::refresh::RefreshOutcome;
use crate::source::SourceKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Periodically refreshes a set of sources and prints their status.
pub struct Watcher {
    dashboard: Arc<Dashboard>,
    sources: Vec<SourceKind>,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Watcher {
    /// An empty `sources` list watches every enabled source.
    pub fn new(dashboard: Arc<Dashboard>, sources: Vec<SourceKind>, interval: Duration) -> Self {
        let sources = if sources.is_empty() {
            SourceKind::ALL
                .into_iter()
                .filter(|kind| dashboard.is_enabled(*kind))
                .collect()
        } else {
            sources
        };

        Self {
            dashboard,
            sources,
            interval,
            max_cycles: None,
        }
    }

    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Refresh every watched source once, concurrently.
    pub async fn run_cycle(&self) -> Vec<(SourceKind, RefreshOutcome)> {
        let dashboard = &self.dashboard;
        let refreshes = self
            .sources
            .iter()
            .map(|kind| async move { (*kind, dashboard.refresh(*kind).await) });
        futures::future::join_all(refreshes).await
    }

    /// Status lines for the outcomes of one cycle.
    pub fn format_cycle(&self, outcomes: &[(SourceKind, RefreshOutcome)]) -> String {
        outcomes
            .iter()
            .map(|(kind, outcome)| {
                let view = match kind {
                    SourceKind::Fault => {
                        SourceStatusView::new(*kind, &self.dashboard.fault.state(), outcome)
                    }
                    SourceKind::FaultTimeline => SourceStatusView::new(
                        *kind,
                        &self.dashboard.fault_timeline.state(),
                        outcome,
                    ),
                    SourceKind::Balena => {
                        SourceStatusView::new(*kind, &self.dashboard.balena.state(), outcome)
                    }
                    SourceKind::Cleaning => {
                        SourceStatusView::new(*kind, &self.dashboard.cleaning.state(), outcome)
                    }
                    SourceKind::Onboarding => {
                        SourceStatusView::new(*kind, &self.dashboard.onboarding.state(), outcome)
                    }
                };
                format_status_line(&view)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Start the watch loop.
    /// Returns a JoinHandle that resolves when the loop stops.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                interval_seconds = self.interval.as_secs(),
                sources = self.sources.len(),
                "Watcher started"
            );

            let mut cycles = 0u64;
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Watcher shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let outcomes = tokio::select! {
                            biased;
                            _ = cancel_token.cancelled() => {
                                self.dashboard.cancel_in_flight();
                                tracing::info!("Watcher shutting down, cycle interrupted");
                                break;
                            }
                            outcomes = self.run_cycle() => outcomes,
                        };
                        println!("{}\n", self.format_cycle(&outcomes));
                        cycles += 1;
                        tracing::debug!(cycle = cycles, "Watch cycle completed");

                        if self.max_cycles.is_some_and(|max| cycles >= max) {
                            break;
                        }
                    }
                }
            }
        })
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Handle `framewatch watch` command
pub async fn handle_watch(args: &WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.interval == 0 {
        return Err("interval must be at least 1 second".into());
    }

    let config = load_config(&args.config, args.log_level.as_deref())?;
    init_command_tracing(&config);

    let dashboard = Arc::new(Dashboard::from_config(&config)?);
    let cancel_token = CancellationToken::new();

    let watcher = Watcher::new(
        dashboard,
        args.source.clone(),
        Duration::from_secs(args.interval),
    )
    .with_max_cycles(args.count);
    let mut handle = watcher.start(cancel_token.clone());

    tokio::select! {
        _ = shutdown_signal(cancel_token.clone()) => {}
        result = &mut handle => {
            result?;
            return Ok(());
        }
    }

    handle.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DashboardConfig, SourceConfig};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_dashboard() -> Arc<Dashboard> {
        let mut config = DashboardConfig::default();
        config.proxy.rewriters.clear();
        for kind in SourceKind::ALL {
            *config.sources.overrides_mut(kind) = SourceConfig {
                endpoints: Some(vec!["http://127.0.0.1:9/stats".to_string()]),
                opaque_probe: Some(false),
                ..Default::default()
            };
        }
        config.sources.onboarding.enabled = Some(false);
        Arc::new(Dashboard::from_config(&config).unwrap())
    }

    #[test]
    fn test_default_sources_are_enabled_ones() {
        let watcher = Watcher::new(offline_dashboard(), vec![], Duration::from_secs(1));
        assert_eq!(watcher.sources.len(), 4);
        assert!(!watcher.sources.contains(&SourceKind::Onboarding));
    }

    #[tokio::test]
    async fn test_run_cycle_refreshes_each_source() {
        let watcher = Watcher::new(
            offline_dashboard(),
            vec![SourceKind::Fault, SourceKind::Cleaning],
            Duration::from_secs(1),
        );
        let outcomes = watcher.run_cycle().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|(_, o)| matches!(o, RefreshOutcome::MockFallback { .. })));

        let text = watcher.format_cycle(&outcomes);
        assert!(text.contains("fault"));
        assert!(text.contains("cleaning"));
    }

    #[tokio::test]
    async fn test_loop_stops_after_max_cycles() {
        let watcher = Watcher::new(
            offline_dashboard(),
            vec![SourceKind::Fault],
            Duration::from_millis(10),
        )
        .with_max_cycles(Some(2));
        let handle = watcher.start(CancellationToken::new());
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_slow_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(8)),
            )
            .mount(&server)
            .await;

        let mut config = DashboardConfig::default();
        config.proxy.rewriters.clear();
        config.proxy.request_timeout_seconds = 30;
        *config.sources.overrides_mut(SourceKind::Fault) = SourceConfig {
            endpoints: Some(vec![format!("{}/stats", server.uri())]),
            ..Default::default()
        };
        let dashboard = Arc::new(Dashboard::from_config(&config).unwrap());

        let watcher = Watcher::new(
            dashboard.clone(),
            vec![SourceKind::Fault],
            Duration::from_secs(3600),
        );
        let token = CancellationToken::new();
        let handle = watcher.start(token.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(dashboard.fault.state().is_loading);

        let cancelled_at = std::time::Instant::now();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(cancelled_at.elapsed() < Duration::from_secs(2));

        let state = dashboard.fault.state();
        assert!(!state.is_loading);
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let watcher = Watcher::new(offline_dashboard(), vec![], Duration::from_secs(3600));
        let token = CancellationToken::new();
        let handle = watcher.start(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
