//! Cleaning pipeline statistics (15s frames).

use super::{decode_records, endpoint_tag, fetch_merged, FetchError, SourceKind, TelemetrySource};
use crate::mock;
use crate::proxy::ProxyChain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub first_frame_timestamp: String,
    pub last_frame_timestamp: String,
    pub frames_with_10s_delay: u64,
    pub frames_with_15s_delay: u64,
    pub frames_with_20s_delay: u64,
    #[serde(rename = "total_frames_recieved_since_first_frame")]
    pub total_frames_received: u64,
    #[serde(rename = "total_frames_should_have_recieved_since_first_frame")]
    pub total_frames_expected: u64,
    /// Always set by the fetcher, the upstream payload does not carry it
    #[serde(rename = "serverIp", default)]
    pub server_ip: String,
}

pub type CleaningSnapshot = BTreeMap<String, CleaningStats>;

pub struct CleaningSource {
    chain: ProxyChain,
    endpoints: Vec<String>,
}

impl CleaningSource {
    pub fn new(chain: ProxyChain, endpoints: Vec<String>) -> Self {
        Self { chain, endpoints }
    }

    /// Tag used for mock records: the first configured server.
    fn primary_tag(&self) -> String {
        self.endpoints
            .first()
            .map(|e| endpoint_tag(e))
            .unwrap_or_default()
    }
}

fn decode(value: serde_json::Value, tag: &str) -> Result<CleaningSnapshot, FetchError> {
    let mut records: CleaningSnapshot = decode_records(SourceKind::Cleaning.as_str(), value)?;
    for stats in records.values_mut() {
        stats.server_ip = tag.to_string();
    }
    Ok(records)
}

#[async_trait]
impl TelemetrySource for CleaningSource {
    type Snapshot = CleaningSnapshot;

    fn kind(&self) -> SourceKind {
        SourceKind::Cleaning
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<CleaningSnapshot, FetchError> {
        fetch_merged(
            SourceKind::Cleaning.as_str(),
            &self.chain,
            &self.endpoints,
            cancel,
            decode,
        )
        .await
    }

    fn mock_snapshot(&self) -> CleaningSnapshot {
        mock::cleaning_snapshot(&self.primary_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_overrides_server_tag() {
        let value = json!({
            "0CXYZ_cleaningStation123": {
                "first_frame_timestamp": "2025-05-08 10:30:15",
                "frames_with_10s_delay": 15,
                "frames_with_15s_delay": 5,
                "frames_with_20s_delay": 2,
                "last_frame_timestamp": "2025-05-09 11:45:30",
                "total_frames_recieved_since_first_frame": 3450,
                "total_frames_should_have_recieved_since_first_frame": 3500,
                "serverIp": "spoofed"
            }
        });
        let snapshot = decode(value, "35.244.44.28:5020").unwrap();
        assert_eq!(
            snapshot["0CXYZ_cleaningStation123"].server_ip,
            "35.244.44.28:5020"
        );
    }

    #[test]
    fn test_mock_uses_primary_endpoint_tag() {
        let source = CleaningSource::new(
            ProxyChain::direct(reqwest::Client::new(), std::time::Duration::from_secs(1)),
            vec!["http://10.1.2.3:5020/get_frame_timestamp_stats".to_string()],
        );
        let mock = source.mock_snapshot();
        assert!(!mock.is_empty());
        assert!(mock.values().all(|s| s.server_ip == "10.1.2.3:5020"));
    }
}
