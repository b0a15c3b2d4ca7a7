//! Substitute snapshots used when a source cannot be reached.
//!
//! Every function here is pure and produces data with exactly the shape the
//! matching fetcher returns, so consumers never need to tell them apart.

use crate::source::{
    BalenaCacheStats, BalenaSnapshot, CenterRecord, CleaningSnapshot, CleaningStats, FaultCounts,
    FaultSnapshot, FaultStats, OnboardingSheet,
};
use std::collections::BTreeMap;

pub fn fault_snapshot() -> FaultSnapshot {
    BTreeMap::from([(
        "0MNYH_mayfieldGarden123".to_string(),
        FaultStats {
            first_frame_timestamp: "2025-04-25 14:56:39".to_string(),
            last_frame_timestamp: "2025-04-25 18:29:56".to_string(),
            frames_with_5s_delay: 29,
            frames_with_10s_delay: 3,
            frames_with_15s_delay: 2,
            total_frames_received: 2540,
            total_frames_expected: 2561,
            server_ip: Some("34.93.233.94:5020".to_string()),
        },
    )])
}

pub fn fault_counts() -> FaultCounts {
    FaultCounts {
        fault_count_5s: BTreeMap::from([
            ("0MNYH_mayfieldGarden123".to_string(), 29),
            ("1ABCD_downtownStation".to_string(), 12),
        ]),
        fault_count_10s: BTreeMap::from([
            ("0MNYH_mayfieldGarden123".to_string(), 3),
            ("1ABCD_downtownStation".to_string(), 1),
        ]),
        timestamp: "2025-04-25 18:29:56".to_string(),
    }
}

pub fn balena_snapshot() -> BalenaSnapshot {
    BTreeMap::from([
        (
            "0MNYH_mayfieldGarden123".to_string(),
            BalenaCacheStats {
                cache_frames_with_delay_more_than_1s: 174,
                delay_times: vec![2, 3, 2, 2, 2, 2, 2],
                last_frame_timestamp: "2025-04-30 13:32:50".to_string(),
                start_timestamp: "2025-04-30 12:57:45".to_string(),
                total_1s_frames_captured: 1933,
                total_delayed_frames: 174,
                total_reconnect_instances: 0,
                weighted_avg_delay: 2.13,
            },
        ),
        (
            "1ABCD_downtownStation".to_string(),
            BalenaCacheStats {
                cache_frames_with_delay_more_than_1s: 250,
                delay_times: vec![2, 4, 3, 2, 3],
                last_frame_timestamp: "2025-04-30 13:30:20".to_string(),
                start_timestamp: "2025-04-30 12:50:15".to_string(),
                total_1s_frames_captured: 2400,
                total_delayed_frames: 250,
                total_reconnect_instances: 2,
                weighted_avg_delay: 2.8,
            },
        ),
    ])
}

/// `server_ip` tags every record, as the real fetcher does.
pub fn cleaning_snapshot(server_ip: &str) -> CleaningSnapshot {
    let station = |first: &str, last: &str, delays: [u64; 3], received: u64, expected: u64| {
        CleaningStats {
            first_frame_timestamp: first.to_string(),
            last_frame_timestamp: last.to_string(),
            frames_with_10s_delay: delays[0],
            frames_with_15s_delay: delays[1],
            frames_with_20s_delay: delays[2],
            total_frames_received: received,
            total_frames_expected: expected,
            server_ip: server_ip.to_string(),
        }
    };

    BTreeMap::from([
        (
            "0CXYZ_cleaningStation123".to_string(),
            station("2025-05-08 10:30:15", "2025-05-09 11:45:30", [15, 5, 2], 3450, 3500),
        ),
        (
            "1DEFG_maintenanceArea456".to_string(),
            station("2025-05-08 09:15:22", "2025-05-09 11:50:42", [8, 3, 1], 3680, 3700),
        ),
        (
            "2HIJK_sanitationZone789".to_string(),
            station("2025-05-08 11:20:05", "2025-05-09 11:55:18", [20, 10, 5], 3240, 3300),
        ),
    ])
}

pub fn onboarding_sheet() -> OnboardingSheet {
    let headers: Vec<String> = ["ID", "Center", "Classroom", "Status", "Date"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    let rows = [
        ["1", "Delhi Center", "Classroom A", "Complete", "2025-05-10"],
        ["2", "Mumbai Center", "Classroom B", "Incomplete", "2025-05-12"],
        ["3", "Bangalore Center", "Classroom C", "Complete", "2025-05-15"],
    ]
    .iter()
    .enumerate()
    .map(|(index, cells)| CenterRecord {
        id: index.to_string(),
        fields: headers
            .iter()
            .cloned()
            .zip(cells.iter().map(|c| c.to_string()))
            .collect(),
    })
    .collect();

    OnboardingSheet { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mocks_are_deterministic() {
        assert_eq!(fault_snapshot(), fault_snapshot());
        assert_eq!(cleaning_snapshot("a:1"), cleaning_snapshot("a:1"));
        assert_eq!(onboarding_sheet(), onboarding_sheet());
    }

    #[test]
    fn test_mock_onboarding_row_ids_are_positional() {
        let sheet = onboarding_sheet();
        let ids: Vec<&str> = sheet.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(sheet.rows[2].get("Center"), Some("Bangalore Center"));
    }
}
