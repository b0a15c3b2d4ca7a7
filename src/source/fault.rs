//! Frame-capture statistics (5s frames) from the station servers.

use super::{decode_records, fetch_merged, FetchError, SourceKind, TelemetrySource};
use crate::mock;
use crate::proxy::ProxyChain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Per-location frame counters reported by a station server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultStats {
    pub first_frame_timestamp: String,
    pub last_frame_timestamp: String,
    pub frames_with_5s_delay: u64,
    pub frames_with_10s_delay: u64,
    pub frames_with_15s_delay: u64,
    #[serde(rename = "total_frames_recieved_since_first_frame")]
    pub total_frames_received: u64,
    #[serde(rename = "total_frames_should_have_recieved_since_first_frame")]
    pub total_frames_expected: u64,
    /// Endpoint the record came from, `host:port`
    #[serde(rename = "serverIp", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
}

pub type FaultSnapshot = BTreeMap<String, FaultStats>;

/// Fetches and merges frame statistics from every configured server.
pub struct FaultSource {
    chain: ProxyChain,
    endpoints: Vec<String>,
}

impl FaultSource {
    pub fn new(chain: ProxyChain, endpoints: Vec<String>) -> Self {
        Self { chain, endpoints }
    }
}

fn decode(value: serde_json::Value, tag: &str) -> Result<FaultSnapshot, FetchError> {
    let mut records: FaultSnapshot = decode_records(SourceKind::Fault.as_str(), value)?;
    for stats in records.values_mut() {
        stats.server_ip = Some(tag.to_string());
    }
    Ok(records)
}

#[async_trait]
impl TelemetrySource for FaultSource {
    type Snapshot = FaultSnapshot;

    fn kind(&self) -> SourceKind {
        SourceKind::Fault
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<FaultSnapshot, FetchError> {
        fetch_merged(
            SourceKind::Fault.as_str(),
            &self.chain,
            &self.endpoints,
            cancel,
            decode,
        )
        .await
    }

    fn mock_snapshot(&self) -> FaultSnapshot {
        mock::fault_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_tags_records() {
        let value = json!({
            "0MNYH_mayfieldGarden123": {
                "first_frame_timestamp": "2025-04-25 14:56:39",
                "frames_with_10s_delay": 3,
                "frames_with_15s_delay": 2,
                "frames_with_5s_delay": 29,
                "last_frame_timestamp": "2025-04-25 18:29:56",
                "total_frames_recieved_since_first_frame": 2540,
                "total_frames_should_have_recieved_since_first_frame": 2561
            }
        });

        let snapshot = decode(value, "34.93.233.94:5020").unwrap();
        let stats = &snapshot["0MNYH_mayfieldGarden123"];
        assert_eq!(stats.total_frames_received, 2540);
        assert_eq!(stats.total_frames_expected, 2561);
        assert_eq!(stats.server_ip.as_deref(), Some("34.93.233.94:5020"));
    }

    #[test]
    fn test_decode_rejects_missing_counter() {
        let value = json!({
            "station": {
                "first_frame_timestamp": "2025-04-25 14:56:39",
                "last_frame_timestamp": "2025-04-25 18:29:56"
            }
        });
        assert!(matches!(
            decode(value, "tag"),
            Err(FetchError::Validation { .. })
        ));
    }

    #[test]
    fn test_serialize_keeps_wire_names() {
        let snapshot = mock::fault_snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();
        let record = value.as_object().unwrap().values().next().unwrap();
        assert!(record
            .get("total_frames_recieved_since_first_frame")
            .is_some());
    }

    #[test]
    fn test_mock_matches_shape() {
        let value = serde_json::to_value(mock::fault_snapshot()).unwrap();
        assert!(decode(value, "tag").is_ok());
    }
}
