//! Balena cache ingestion statistics (1s frames).

use super::{decode_records, fetch_first, FetchError, SourceKind, TelemetrySource};
use crate::mock;
use crate::proxy::ProxyChain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalenaCacheStats {
    pub cache_frames_with_delay_more_than_1s: u64,
    pub delay_times: Vec<u64>,
    pub last_frame_timestamp: String,
    pub start_timestamp: String,
    pub total_1s_frames_captured: u64,
    pub total_delayed_frames: u64,
    pub total_reconnect_instances: u64,
    pub weighted_avg_delay: f64,
}

pub type BalenaSnapshot = BTreeMap<String, BalenaCacheStats>;

/// Tries each configured cache endpoint in turn until one answers.
pub struct BalenaSource {
    chain: ProxyChain,
    endpoints: Vec<String>,
}

impl BalenaSource {
    pub fn new(chain: ProxyChain, endpoints: Vec<String>) -> Self {
        Self { chain, endpoints }
    }
}

#[async_trait]
impl TelemetrySource for BalenaSource {
    type Snapshot = BalenaSnapshot;

    fn kind(&self) -> SourceKind {
        SourceKind::Balena
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<BalenaSnapshot, FetchError> {
        let name = SourceKind::Balena.as_str();
        fetch_first(name, &self.endpoints, cancel, |endpoint| async move {
            let value = self
                .chain
                .resolve_json(&endpoint, cancel)
                .await
                .map_err(|e| FetchError::from_resolve(name, e))?;
            decode_records(name, value)
        })
        .await
    }

    fn mock_snapshot(&self) -> BalenaSnapshot {
        mock::balena_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_balena_record() {
        let value = json!({
            "0MNYH_mayfieldGarden123": {
                "cache_frames_with_delay_more_than_1s": 174,
                "delay_times": [2, 3, 2],
                "last_frame_timestamp": "2025-04-30 13:32:50",
                "start_timestamp": "2025-04-30 12:57:45",
                "total_1s_frames_captured": 1933,
                "total_delayed_frames": 174,
                "total_reconnect_instances": 0,
                "weighted_avg_delay": 2.13
            }
        });
        let snapshot: BalenaSnapshot = decode_records("balena", value).unwrap();
        assert_eq!(snapshot["0MNYH_mayfieldGarden123"].delay_times, vec![2, 3, 2]);
    }

    #[test]
    fn test_mock_round_trips_through_validation() {
        let value = serde_json::to_value(mock::balena_snapshot()).unwrap();
        let decoded: BalenaSnapshot = decode_records("balena", value).unwrap();
        assert_eq!(decoded, mock::balena_snapshot());
    }
}
