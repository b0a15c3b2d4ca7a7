//! Shared test utilities for framewatch integration tests.
//!
//! Payload builders in the upstream wire format plus helpers for chains and
//! configurations pointed at a wiremock server.

#![allow(dead_code)]

use framewatch::config::{DashboardConfig, SourceConfig};
use framewatch::proxy::ProxyChain;
use framewatch::source::SourceKind;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Payload Builders
// =============================================================================

/// Fault/cleaning style record with the upstream field spelling.
pub fn frame_record(received: u64, expected: u64) -> Value {
    json!({
        "first_frame_timestamp": "2025-04-25 14:56:39",
        "last_frame_timestamp": "2025-04-25 18:29:56",
        "frames_with_5s_delay": 1,
        "frames_with_10s_delay": 2,
        "frames_with_15s_delay": 3,
        "frames_with_20s_delay": 4,
        "total_frames_recieved_since_first_frame": received,
        "total_frames_should_have_recieved_since_first_frame": expected,
    })
}

pub fn balena_record(captured: u64, delayed: u64) -> Value {
    json!({
        "cache_frames_with_delay_more_than_1s": delayed,
        "delay_times": [2, 3],
        "last_frame_timestamp": "2025-04-30 13:32:50",
        "start_timestamp": "2025-04-30 12:57:45",
        "total_1s_frames_captured": captured,
        "total_delayed_frames": delayed,
        "total_reconnect_instances": 0,
        "weighted_avg_delay": 2.5,
    })
}

pub fn fault_counts(five: u64, ten: u64, timestamp: &str) -> Value {
    json!({
        "fault_count_5s": { "stationA": five },
        "fault_count_10s": { "stationA": ten },
        "timestamp": timestamp,
    })
}

// =============================================================================
// Server Helpers
// =============================================================================

/// Serve `body` as JSON on GET `route`.
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `body` as JSON on GET `route` after `delay`.
pub async fn mount_json_delayed(server: &MockServer, route: &str, body: Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Direct-only chain with a short per-request timeout.
pub fn direct_chain() -> ProxyChain {
    ProxyChain::direct(reqwest::Client::new(), Duration::from_secs(2))
}

/// Configuration where every source hits `server` directly and no third-party
/// proxy is ever contacted.
pub fn offline_config(server_uri: &str) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.proxy.rewriters.clear();
    config.proxy.request_timeout_seconds = 2;

    for kind in SourceKind::ALL {
        *config.sources.overrides_mut(kind) = SourceConfig {
            endpoints: Some(vec![format!("{}/{}", server_uri, kind.as_str())]),
            opaque_probe: Some(false),
            cooldown_seconds: Some(0),
            ..Default::default()
        };
    }
    config
}
