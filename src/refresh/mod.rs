//! Refresh state containers.
//!
//! A [`RefreshHook`] owns the state of one telemetry source and is the only
//! thing that mutates it. `refresh()` runs the source's fetcher and stores
//! either the real snapshot or, when every attempt failed, the mock one.
//! Overlapping calls are handled according to the source's [`Concurrency`]
//! policy, and sources with a cooldown reject refreshes until it elapses.

mod history;
mod state;

pub use history::{Sample, SampleHistory};
pub use state::{RefreshPhase, RefreshState};

use crate::config::SourceSettings;
use crate::logging::generate_refresh_id;
use crate::source::{FetchError, SourceKind, TelemetrySource};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What `refresh()` does when another refresh is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Drop the new call
    Ignore,
    /// Cancel the in-flight call and replace it
    Supersede,
    /// Let calls race; the last one to resolve writes
    Overlap,
}

/// Refresh behavior of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub concurrency: Concurrency,
    /// Started after each successful fetch
    pub cooldown: Option<Duration>,
    /// Whole-fetch deadline; expiry counts as a failure
    pub timeout: Option<Duration>,
    /// Substitute mock data on failure instead of entering the error phase
    pub mock_fallback: bool,
    /// Successful snapshots kept in history, 0 disables it
    pub history_capacity: usize,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::Overlap,
            cooldown: None,
            timeout: None,
            mock_fallback: true,
            history_capacity: 0,
        }
    }
}

impl From<&SourceSettings> for RefreshPolicy {
    fn from(settings: &SourceSettings) -> Self {
        Self {
            concurrency: settings.concurrency,
            cooldown: settings.cooldown(),
            timeout: settings.timeout(),
            mock_fallback: settings.mock_fallback,
            history_capacity: settings.history_capacity,
        }
    }
}

/// Result of a single `refresh()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Real data stored
    Success,
    /// Fetch failed, mock data stored
    MockFallback { reason: String },
    /// Fetch failed, mock fallback disabled
    Failed { reason: String },
    /// Cancelled or overtaken by a newer call; state untouched
    Superseded,
    /// Another refresh was in flight
    Ignored,
    /// Rejected before any request was made
    CoolingDown { remaining: Duration },
}

impl RefreshOutcome {
    /// Message worth showing to a user, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            RefreshOutcome::CoolingDown { remaining } => Some(format!(
                "Please wait {}s before refreshing again",
                remaining.as_millis().div_ceil(1000)
            )),
            RefreshOutcome::MockFallback { .. } => {
                Some("Using mock data - API connection failed".to_string())
            }
            RefreshOutcome::Failed { reason } => Some(reason.clone()),
            RefreshOutcome::Success | RefreshOutcome::Superseded | RefreshOutcome::Ignored => None,
        }
    }

    /// True if this call wrote data or an error into the state.
    pub fn updated_state(&self) -> bool {
        matches!(
            self,
            RefreshOutcome::Success
                | RefreshOutcome::MockFallback { .. }
                | RefreshOutcome::Failed { .. }
        )
    }
}

struct HookInner<D> {
    state: RefreshState<D>,
    /// Phase to show once nothing is in flight
    settled: RefreshPhase,
    in_flight: usize,
    generation: u64,
    active: Option<CancellationToken>,
    cooldown_until: Option<Instant>,
}

impl<D> HookInner<D> {
    fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

/// State container for one telemetry source.
///
/// Dropping the hook cancels every in-flight fetch.
pub struct RefreshHook<S: TelemetrySource> {
    source: S,
    policy: RefreshPolicy,
    inner: Mutex<HookInner<S::Snapshot>>,
    updates: watch::Sender<RefreshState<S::Snapshot>>,
    history: Option<SampleHistory<S::Snapshot>>,
    shutdown: CancellationToken,
}

impl<S: TelemetrySource> RefreshHook<S> {
    pub fn new(source: S, policy: RefreshPolicy) -> Self {
        let (updates, _) = watch::channel(RefreshState::default());
        let history =
            (policy.history_capacity > 0).then(|| SampleHistory::new(policy.history_capacity));

        Self {
            source,
            policy,
            inner: Mutex::new(HookInner {
                state: RefreshState::default(),
                settled: RefreshPhase::Idle,
                in_flight: 0,
                generation: 0,
                active: None,
                cooldown_until: None,
            }),
            updates,
            history,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Current state, with the cooldown flag evaluated now.
    pub fn state(&self) -> RefreshState<S::Snapshot> {
        let mut inner = self.lock();
        Self::sync_cooldown(&mut inner);
        inner.state.clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState<S::Snapshot>> {
        self.updates.subscribe()
    }

    /// Stored samples, oldest first. Empty when history is disabled.
    pub fn history(&self) -> Vec<Sample<S::Snapshot>> {
        self.history
            .as_ref()
            .map(SampleHistory::get_all)
            .unwrap_or_default()
    }

    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.lock().cooldown_remaining(Instant::now())
    }

    /// Fetch the source and store the result.
    pub async fn refresh(&self) -> RefreshOutcome {
        let kind = self.source.kind();

        let (generation, cancel) = {
            let mut inner = self.lock();

            if let Some(remaining) = inner.cooldown_remaining(Instant::now()) {
                tracing::info!(
                    source = %kind,
                    remaining_ms = remaining.as_millis() as u64,
                    "Refresh rejected during cooldown"
                );
                return RefreshOutcome::CoolingDown { remaining };
            }

            if inner.in_flight > 0 {
                match self.policy.concurrency {
                    Concurrency::Ignore => {
                        tracing::debug!(source = %kind, "Refresh already in progress, ignoring");
                        return RefreshOutcome::Ignored;
                    }
                    Concurrency::Supersede => {
                        if let Some(previous) = inner.active.take() {
                            tracing::debug!(source = %kind, "Cancelling superseded refresh");
                            previous.cancel();
                        }
                    }
                    Concurrency::Overlap => {}
                }
            }

            let cancel = self.shutdown.child_token();
            inner.generation += 1;
            inner.in_flight += 1;
            inner.active = Some(cancel.clone());
            inner.state.is_loading = true;
            inner.state.phase = RefreshPhase::Loading;
            self.publish(&mut inner);

            (inner.generation, cancel)
        };
        let mut in_flight = InFlight {
            hook: self,
            generation,
            cancel: cancel.clone(),
            finished: false,
        };

        let span = tracing::info_span!(
            "refresh",
            source = %kind,
            refresh_id = %generate_refresh_id()
        );
        let started = std::time::Instant::now();
        let result = self.run_fetch(&cancel).instrument(span).await;
        metrics::histogram!("framewatch_refresh_duration_seconds",
            "source" => kind.as_str()
        )
        .record(started.elapsed().as_secs_f64());

        let mut inner = self.lock();
        in_flight.finished = true;
        let latest = Self::release(&mut inner, generation);

        let stale = self.policy.concurrency == Concurrency::Supersede && !latest;
        let outcome = match result {
            _ if stale => {
                tracing::debug!(source = %kind, "Discarding result of superseded refresh");
                RefreshOutcome::Superseded
            }
            Err(FetchError::Cancelled) => RefreshOutcome::Superseded,
            Ok(data) => {
                if let Some(history) = &self.history {
                    history.push(data.clone());
                }
                if inner.state.apply_success(data) {
                    tracing::info!(source = %kind, "API connection restored");
                }
                inner.settled = RefreshPhase::Success;
                if let Some(cooldown) = self.policy.cooldown {
                    inner.cooldown_until = Some(Instant::now() + cooldown);
                }
                RefreshOutcome::Success
            }
            Err(error) if self.policy.mock_fallback => {
                let reason = error.to_string();
                let mock = self.source.mock_snapshot();
                if inner.state.apply_mock(mock, format!("Using mock data: {}", reason)) {
                    tracing::warn!(
                        source = %kind,
                        error = %reason,
                        "Using mock data - API connection failed"
                    );
                } else {
                    tracing::debug!(source = %kind, error = %reason, "Source still unreachable");
                }
                inner.settled = RefreshPhase::MockFallback;
                RefreshOutcome::MockFallback { reason }
            }
            Err(error) => {
                let reason = error.to_string();
                tracing::error!(source = %kind, error = %reason, "Refresh failed");
                inner.state.apply_error(reason.clone());
                inner.settled = RefreshPhase::Error;
                RefreshOutcome::Failed { reason }
            }
        };

        self.settle(&mut inner);

        outcome
    }

    /// Cancel whatever is in flight without waiting for it.
    pub fn cancel_in_flight(&self) {
        if let Some(active) = self.lock().active.take() {
            active.cancel();
        }
    }

    async fn run_fetch(&self, cancel: &CancellationToken) -> Result<S::Snapshot, FetchError> {
        match self.policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.source.fetch(cancel)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_secs = limit.as_secs(), "Fetch timed out");
                    Err(FetchError::Timeout(limit.as_secs()))
                }
            },
            None => self.source.fetch(cancel).await,
        }
    }

    /// Drop one in-flight call. Returns true if it was the latest one.
    fn release(inner: &mut HookInner<S::Snapshot>, generation: u64) -> bool {
        inner.in_flight = inner.in_flight.saturating_sub(1);
        let latest = inner.generation == generation;
        if latest {
            inner.active = None;
        }
        latest
    }

    /// Recompute the loading flags and publish.
    fn settle(&self, inner: &mut HookInner<S::Snapshot>) {
        inner.state.is_loading = inner.in_flight > 0;
        inner.state.phase = if inner.in_flight > 0 {
            RefreshPhase::Loading
        } else {
            inner.settled
        };
        self.publish(inner);
    }

    fn lock(&self) -> MutexGuard<'_, HookInner<S::Snapshot>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sync_cooldown(inner: &mut HookInner<S::Snapshot>) {
        inner.state.cooldown_active = inner.cooldown_remaining(Instant::now()).is_some();
    }

    fn publish(&self, inner: &mut HookInner<S::Snapshot>) {
        Self::sync_cooldown(inner);
        self.updates.send_replace(inner.state.clone());
    }
}

/// Bookkeeping for one `refresh()` call that also runs when the caller drops
/// the future before it completes.
struct InFlight<'a, S: TelemetrySource> {
    hook: &'a RefreshHook<S>,
    generation: u64,
    cancel: CancellationToken,
    finished: bool,
}

impl<S: TelemetrySource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.cancel.cancel();
        let mut inner = self.hook.lock();
        RefreshHook::<S>::release(&mut inner, self.generation);
        self.hook.settle(&mut inner);
        tracing::debug!(source = %self.hook.kind(), "Refresh dropped before completion");
    }
}

impl<S: TelemetrySource> Drop for RefreshHook<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
