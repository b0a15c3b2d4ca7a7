//! Per-source telemetry fetchers.
//!
//! Each source owns its endpoints, runs them through a [`ProxyChain`],
//! validates the payload shape and normalizes it into a snapshot. Sources
//! with several endpoints either merge them (fault, cleaning) or take the
//! first that answers (balena, onboarding).

pub mod balena;
pub mod cleaning;
mod error;
pub mod fault;
pub mod fault_timeline;
pub mod onboarding;

pub use balena::{BalenaCacheStats, BalenaSnapshot, BalenaSource};
pub use cleaning::{CleaningSnapshot, CleaningSource, CleaningStats};
pub use error::FetchError;
pub use fault::{FaultSnapshot, FaultSource, FaultStats};
pub use fault_timeline::{
    timeline_locations, timeline_points, FaultCounts, FaultTimelineSource, TimelinePoint,
};
pub use onboarding::{parse_sheet, CenterRecord, OnboardingSheet, OnboardingSource};

use crate::config::SourceSettings;
use crate::proxy::ProxyChain;
use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// The telemetry sources the dashboard knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Frame-capture statistics (5s frames)
    Fault,
    /// Historical fault counts for time-series charts
    FaultTimeline,
    /// Balena cache ingestion (1s frames)
    Balena,
    /// Cleaning pipeline stage (15s frames)
    Cleaning,
    /// Spreadsheet-backed onboarding tracker
    Onboarding,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Fault,
        SourceKind::FaultTimeline,
        SourceKind::Balena,
        SourceKind::Cleaning,
        SourceKind::Onboarding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Fault => "fault",
            SourceKind::FaultTimeline => "fault_timeline",
            SourceKind::Balena => "balena",
            SourceKind::Cleaning => "cleaning",
            SourceKind::Onboarding => "onboarding",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetcher for one telemetry source.
///
/// Implementations must honor `cancel`: once it fires, `fetch` returns
/// [`FetchError::Cancelled`] without issuing further requests.
#[async_trait]
pub trait TelemetrySource: Send + Sync + 'static {
    /// Normalized payload, identical in shape for real and mock data
    type Snapshot: Clone + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> SourceKind;

    /// Fetch, validate and normalize the current snapshot.
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Self::Snapshot, FetchError>;

    /// Structurally valid substitute used when every fetch attempt fails.
    fn mock_snapshot(&self) -> Self::Snapshot;
}

/// Derive the chain a source should use from the shared one.
pub fn chain_for(base: &ProxyChain, settings: &SourceSettings) -> ProxyChain {
    let chain = base.clone().with_opaque_probe(settings.opaque_probe);
    if settings.use_proxies {
        chain
    } else {
        chain.without_proxies()
    }
}

/// `host:port` of an endpoint, used to tag records with their origin.
pub fn endpoint_tag(endpoint: &str) -> String {
    match url::Url::parse(endpoint) {
        Ok(url) => match (url.host_str(), url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => endpoint.to_string(),
        },
        Err(_) => endpoint.to_string(),
    }
}

/// Decode a `{ location: record }` object, failing validation on any record
/// that lacks required fields.
pub(crate) fn decode_records<R: DeserializeOwned>(
    source_name: &str,
    value: serde_json::Value,
) -> Result<BTreeMap<String, R>, FetchError> {
    let serde_json::Value::Object(map) = value else {
        return Err(FetchError::validation(
            source_name,
            "payload is not an object keyed by location",
        ));
    };

    map.into_iter()
        .map(|(location, record)| {
            serde_json::from_value(record)
                .map(|r| (location.clone(), r))
                .map_err(|e| {
                    FetchError::validation(source_name, format!("location '{}': {}", location, e))
                })
        })
        .collect()
}

/// Fetch every endpoint concurrently and merge the per-location records.
///
/// All requests are allowed to settle. Records from later endpoints (in
/// configuration order) replace earlier ones for the same location, whatever
/// order the responses arrive in. Succeeds if at least one endpoint did.
pub(crate) async fn fetch_merged<R, F>(
    source_name: &str,
    chain: &ProxyChain,
    endpoints: &[String],
    cancel: &CancellationToken,
    decode: F,
) -> Result<BTreeMap<String, R>, FetchError>
where
    F: Fn(serde_json::Value, &str) -> Result<BTreeMap<String, R>, FetchError>,
{
    let decode = &decode;
    let requests = endpoints.iter().map(|endpoint| async move {
        let value = chain
            .resolve_json(endpoint, cancel)
            .await
            .map_err(|e| FetchError::from_resolve(source_name, e))?;
        decode(value, &endpoint_tag(endpoint))
    });
    let results = join_all(requests).await;

    let mut merged = BTreeMap::new();
    let mut failures = Vec::new();
    let mut succeeded = 0usize;

    for (endpoint, result) in endpoints.iter().zip(results) {
        match result {
            Ok(records) => {
                succeeded += 1;
                merged.extend(records);
            }
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    source = source_name,
                    endpoint = %endpoint,
                    error = %e,
                    "Endpoint failed"
                );
                failures.push(e);
            }
        }
    }

    if succeeded > 0 {
        return Ok(merged);
    }

    Err(collapse_failures(source_name, failures))
}

/// Try endpoints one after another and return the first success.
pub(crate) async fn fetch_first<T, Fut, F>(
    source_name: &str,
    endpoints: &[String],
    cancel: &CancellationToken,
    fetch_one: F,
) -> Result<T, FetchError>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut failures = Vec::new();

    for endpoint in endpoints {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        match fetch_one(endpoint.clone()).await {
            Ok(value) => return Ok(value),
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    source = source_name,
                    endpoint = %endpoint,
                    error = %e,
                    "Endpoint failed, trying next"
                );
                failures.push(e);
            }
        }
    }

    Err(collapse_failures(source_name, failures))
}

/// A lone failure is reported as is; several become one exhaustion error.
fn collapse_failures(source_name: &str, mut failures: Vec<FetchError>) -> FetchError {
    if failures.len() == 1 {
        return failures.remove(0);
    }
    FetchError::exhausted(
        source_name,
        failures.iter().map(ToString::to_string).collect(),
    )
}
