//! Historical fault counts, sampled into a bounded timeline for charts.

use super::{FetchError, SourceKind, TelemetrySource};
use crate::mock;
use crate::proxy::ProxyChain;
use crate::refresh::Sample;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

/// Fields that must be present and non-null in every payload.
const REQUIRED_FIELDS: [&str; 3] = ["fault_count_5s", "fault_count_10s", "timestamp"];

/// Fault counts per location at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCounts {
    pub fault_count_5s: BTreeMap<String, u64>,
    pub fault_count_10s: BTreeMap<String, u64>,
    pub timestamp: String,
}

/// One chart row: `{location}_5s` / `{location}_10s` series values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub timestamp: String,
    pub values: BTreeMap<String, u64>,
}

pub struct FaultTimelineSource {
    chain: ProxyChain,
    endpoint: String,
}

impl FaultTimelineSource {
    /// Only the first endpoint is used; the feed has a single origin.
    pub fn new(chain: ProxyChain, endpoints: Vec<String>) -> Self {
        Self {
            chain,
            endpoint: endpoints.into_iter().next().unwrap_or_default(),
        }
    }
}

fn decode(value: serde_json::Value) -> Result<FaultCounts, FetchError> {
    let name = SourceKind::FaultTimeline.as_str();
    let Some(object) = value.as_object() else {
        return Err(FetchError::validation(name, "payload is not an object"));
    };

    for field in REQUIRED_FIELDS {
        if object.get(field).map_or(true, serde_json::Value::is_null) {
            return Err(FetchError::validation(
                name,
                format!("missing field `{}`", field),
            ));
        }
    }

    serde_json::from_value(value).map_err(|e| FetchError::validation(name, e.to_string()))
}

#[async_trait]
impl TelemetrySource for FaultTimelineSource {
    type Snapshot = FaultCounts;

    fn kind(&self) -> SourceKind {
        SourceKind::FaultTimeline
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<FaultCounts, FetchError> {
        let value = self
            .chain
            .resolve_json(&self.endpoint, cancel)
            .await
            .map_err(|e| FetchError::from_resolve(SourceKind::FaultTimeline.as_str(), e))?;
        decode(value)
    }

    fn mock_snapshot(&self) -> FaultCounts {
        mock::fault_counts()
    }
}

/// Flatten sampled counts into chart rows, oldest first.
pub fn timeline_points(samples: &[Sample<FaultCounts>]) -> Vec<TimelinePoint> {
    samples
        .iter()
        .map(|sample| {
            let counts = &sample.value;
            let mut values = BTreeMap::new();
            for (location, count) in &counts.fault_count_5s {
                values.insert(format!("{}_5s", location), *count);
            }
            for (location, count) in &counts.fault_count_10s {
                values.insert(format!("{}_10s", location), *count);
            }
            TimelinePoint {
                timestamp: counts.timestamp.clone(),
                values,
            }
        })
        .collect()
}

/// Every location seen across the samples, sorted.
pub fn timeline_locations(samples: &[Sample<FaultCounts>]) -> Vec<String> {
    samples
        .iter()
        .flat_map(|s| {
            s.value
                .fault_count_5s
                .keys()
                .chain(s.value.fault_count_10s.keys())
        })
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
