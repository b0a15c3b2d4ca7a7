//! Per-source refresh state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a source's refresh cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    /// Never refreshed
    Idle,
    /// At least one fetch in flight
    Loading,
    /// Data came from the source
    Success,
    /// Data came from the mock fallback
    MockFallback,
    /// Fetch failed and mock fallback is disabled
    Error,
}

/// Snapshot of a source's state as seen by consumers.
///
/// `is_using_mock_data` is true exactly when the latest population of
/// `data` came from the mock fallback.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshState<D> {
    pub data: Option<D>,
    pub phase: RefreshPhase,
    pub is_loading: bool,
    pub is_using_mock_data: bool,
    pub error: Option<String>,
    pub cooldown_active: bool,
    pub last_updated: Option<DateTime<Utc>>,
    /// Bumped on every data or error write
    pub revision: u64,
}

impl<D> Default for RefreshState<D> {
    fn default() -> Self {
        Self {
            data: None,
            phase: RefreshPhase::Idle,
            is_loading: false,
            is_using_mock_data: false,
            error: None,
            cooldown_active: false,
            last_updated: None,
            revision: 0,
        }
    }
}

impl<D> RefreshState<D> {
    /// Store real data. Returns true if this replaced mock data.
    pub(crate) fn apply_success(&mut self, data: D) -> bool {
        let restored = self.is_using_mock_data;
        self.data = Some(data);
        self.error = None;
        self.is_using_mock_data = false;
        self.touch();
        restored
    }

    /// Store mock data. Returns true if the source just switched to mock.
    pub(crate) fn apply_mock(&mut self, data: D, reason: String) -> bool {
        let switched = !self.is_using_mock_data;
        self.data = Some(data);
        self.error = Some(reason);
        self.is_using_mock_data = true;
        self.touch();
        switched
    }

    /// Record a failure without touching data.
    pub(crate) fn apply_error(&mut self, reason: String) {
        self.error = Some(reason);
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
        self.revision += 1;
    }
}
