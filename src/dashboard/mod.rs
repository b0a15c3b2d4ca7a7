//! Dashboard: one refresh hook per telemetry source.
//!
//! Builds the hooks from [`DashboardConfig`], refreshes them together and
//! exposes the comparative view across the frame pipelines.

mod error;

pub use error::DashboardError;

use crate::config::{DashboardConfig, SourceSettings};
use crate::proxy::{build_client, ProxyChain};
use crate::refresh::{RefreshHook, RefreshOutcome, RefreshPolicy};
use crate::report::{self, ComparisonRow};
use crate::source::{
    chain_for, BalenaSource, CleaningSource, FaultSource, FaultTimelineSource, OnboardingSource,
    SourceKind,
};
use std::collections::BTreeMap;

pub struct Dashboard {
    pub fault: RefreshHook<FaultSource>,
    pub fault_timeline: RefreshHook<FaultTimelineSource>,
    pub balena: RefreshHook<BalenaSource>,
    pub cleaning: RefreshHook<CleaningSource>,
    pub onboarding: RefreshHook<OnboardingSource>,
    settings: BTreeMap<SourceKind, SourceSettings>,
}

impl Dashboard {
    /// Validate the configuration and build every hook.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        config.validate()?;
        let client = build_client()?;
        Ok(Self::with_chain(
            config,
            ProxyChain::new(client, &config.proxy),
        ))
    }

    /// Build every hook on top of an existing chain.
    pub fn with_chain(config: &DashboardConfig, base: ProxyChain) -> Self {
        let settings: BTreeMap<SourceKind, SourceSettings> = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, config.sources.settings(kind)))
            .collect();
        let parts = |kind: SourceKind| {
            let s = &settings[&kind];
            (
                chain_for(&base, s),
                s.endpoints.clone(),
                RefreshPolicy::from(s),
            )
        };

        let (chain, endpoints, policy) = parts(SourceKind::Fault);
        let fault = RefreshHook::new(FaultSource::new(chain, endpoints), policy);
        let (chain, endpoints, policy) = parts(SourceKind::FaultTimeline);
        let fault_timeline = RefreshHook::new(FaultTimelineSource::new(chain, endpoints), policy);
        let (chain, endpoints, policy) = parts(SourceKind::Balena);
        let balena = RefreshHook::new(BalenaSource::new(chain, endpoints), policy);
        let (chain, endpoints, policy) = parts(SourceKind::Cleaning);
        let cleaning = RefreshHook::new(CleaningSource::new(chain, endpoints), policy);
        let (chain, endpoints, policy) = parts(SourceKind::Onboarding);
        let onboarding = RefreshHook::new(OnboardingSource::new(chain, endpoints), policy);

        tracing::debug!(
            enabled = ?settings.iter().filter(|(_, s)| s.enabled).map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            "Dashboard initialized"
        );

        Self {
            fault,
            fault_timeline,
            balena,
            cleaning,
            onboarding,
            settings,
        }
    }

    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        self.settings.get(&kind).is_some_and(|s| s.enabled)
    }

    pub fn settings(&self, kind: SourceKind) -> Option<&SourceSettings> {
        self.settings.get(&kind)
    }

    /// Refresh a single source.
    pub async fn refresh(&self, kind: SourceKind) -> RefreshOutcome {
        match kind {
            SourceKind::Fault => self.fault.refresh().await,
            SourceKind::FaultTimeline => self.fault_timeline.refresh().await,
            SourceKind::Balena => self.balena.refresh().await,
            SourceKind::Cleaning => self.cleaning.refresh().await,
            SourceKind::Onboarding => self.onboarding.refresh().await,
        }
    }

    /// Refresh every enabled source concurrently.
    pub async fn refresh_all(&self) -> Vec<(SourceKind, RefreshOutcome)> {
        let refreshes = SourceKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .map(|kind| async move { (kind, self.refresh(kind).await) });
        futures::future::join_all(refreshes).await
    }

    /// Cancel every in-flight refresh. The cancelled calls report
    /// `Superseded` and leave state untouched.
    pub fn cancel_in_flight(&self) {
        self.fault.cancel_in_flight();
        self.fault_timeline.cancel_in_flight();
        self.balena.cancel_in_flight();
        self.cleaning.cancel_in_flight();
        self.onboarding.cancel_in_flight();
    }

    /// Whether the current data of a source came from the mock fallback.
    pub fn is_using_mock_data(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Fault => self.fault.state().is_using_mock_data,
            SourceKind::FaultTimeline => self.fault_timeline.state().is_using_mock_data,
            SourceKind::Balena => self.balena.state().is_using_mock_data,
            SourceKind::Cleaning => self.cleaning.state().is_using_mock_data,
            SourceKind::Onboarding => self.onboarding.state().is_using_mock_data,
        }
    }

    /// Comparison rows built from whatever data the hooks currently hold.
    pub fn comparison(&self) -> Vec<ComparisonRow> {
        let fault = self.fault.state().data;
        let balena = self.balena.state().data;
        let cleaning = self.cleaning.state().data;
        report::comparison_rows(fault.as_ref(), balena.as_ref(), cleaning.as_ref())
    }
}
