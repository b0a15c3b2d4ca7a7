//! Refresh hook integration tests
//!
//! Concurrency policies, cooldown, timeout and mock fallback with real
//! fetchers talking to wiremock.

mod common;

use common::{balena_record, direct_chain, fault_counts, frame_record, mount_json, offline_config};
use framewatch::config::SourceSettings;
use framewatch::dashboard::Dashboard;
use framewatch::mock;
use framewatch::refresh::{Concurrency, RefreshHook, RefreshOutcome, RefreshPhase, RefreshPolicy};
use framewatch::source::{
    timeline_points, BalenaSource, CleaningSource, FaultSource, FaultTimelineSource, SourceKind,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cleaning_hook(server: &MockServer) -> RefreshHook<CleaningSource> {
    let settings = SourceSettings::defaults_for(SourceKind::Cleaning);
    RefreshHook::new(
        CleaningSource::new(direct_chain(), vec![format!("{}/clean", server.uri())]),
        RefreshPolicy::from(&settings),
    )
}

#[tokio::test]
async fn test_cooldown_blocks_second_refresh_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clean"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"S": frame_record(9, 10)})))
        .expect(1)
        .mount(&server)
        .await;

    let hook = cleaning_hook(&server);
    assert_eq!(hook.refresh().await, RefreshOutcome::Success);

    let outcome = hook.refresh().await;
    match &outcome {
        RefreshOutcome::CoolingDown { remaining } => {
            assert!(*remaining <= Duration::from_secs(15));
            assert!(*remaining > Duration::from_secs(10));
        }
        other => panic!("expected CoolingDown, got {:?}", other),
    }
    assert!(outcome
        .message()
        .unwrap()
        .starts_with("Please wait 15s before refreshing again"));
    assert!(hook.state().cooldown_active);
}

#[tokio::test]
async fn test_ignore_policy_drops_concurrent_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clean"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"S": frame_record(9, 10)}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let hook = cleaning_hook(&server);
    let (first, second) = tokio::join!(hook.refresh(), hook.refresh());

    assert_eq!(first, RefreshOutcome::Success);
    assert_eq!(second, RefreshOutcome::Ignored);
}

#[tokio::test]
async fn test_supersede_keeps_only_latest_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"S": balena_record(100, 1)}))
                .set_delay(Duration::from_millis(800)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"S": balena_record(100, 2)})))
        .with_priority(2)
        .mount(&server)
        .await;

    let hook = Arc::new(RefreshHook::new(
        BalenaSource::new(direct_chain(), vec![format!("{}/cache", server.uri())]),
        RefreshPolicy {
            concurrency: Concurrency::Supersede,
            ..Default::default()
        },
    ));

    let first = tokio::spawn({
        let hook = hook.clone();
        async move { hook.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = hook.refresh().await;

    assert_eq!(second, RefreshOutcome::Success);
    assert_eq!(first.await.unwrap(), RefreshOutcome::Superseded);

    let state = hook.state();
    assert_eq!(state.data.unwrap()["S"].total_delayed_frames, 2);
    assert_eq!(state.revision, 1);
}

#[tokio::test]
async fn test_validation_failure_substitutes_mock_data() {
    let server = MockServer::start().await;
    mount_json(&server, "/stats", json!({"X": {"frames": 1}})).await;

    let hook = RefreshHook::new(
        FaultSource::new(direct_chain(), vec![format!("{}/stats", server.uri())]),
        RefreshPolicy::default(),
    );
    let outcome = hook.refresh().await;

    assert!(matches!(outcome, RefreshOutcome::MockFallback { .. }));
    let state = hook.state();
    assert_eq!(state.phase, RefreshPhase::MockFallback);
    assert!(state.is_using_mock_data);
    assert_eq!(state.data, Some(mock::fault_snapshot()));
    assert!(state.error.unwrap().contains("validation failed"));
}

#[tokio::test]
async fn test_recovery_clears_mock_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"X": frame_record(1, 2)})))
        .with_priority(2)
        .mount(&server)
        .await;

    let hook = RefreshHook::new(
        FaultSource::new(direct_chain(), vec![format!("{}/stats", server.uri())]),
        RefreshPolicy::default(),
    );

    hook.refresh().await;
    assert!(hook.state().is_using_mock_data);

    assert_eq!(hook.refresh().await, RefreshOutcome::Success);
    let state = hook.state();
    assert!(!state.is_using_mock_data);
    assert!(state.error.is_none());
    assert!(state.data.unwrap().contains_key("X"));
}

#[tokio::test]
async fn test_timeout_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fault_counts(1, 1, "t"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let hook = RefreshHook::new(
        FaultTimelineSource::new(direct_chain(), vec![format!("{}/faults", server.uri())]),
        RefreshPolicy {
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        },
    );

    match hook.refresh().await {
        RefreshOutcome::MockFallback { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected MockFallback, got {:?}", other),
    }
    assert_eq!(hook.state().data, Some(mock::fault_counts()));
}

#[tokio::test]
async fn test_fault_timeline_history_bounded() {
    let server = MockServer::start().await;
    for (i, timestamp) in ["t1", "t2"].iter().enumerate() {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fault_counts(i as u64, 0, timestamp)))
            .up_to_n_times(1)
            .with_priority(i as u8 + 1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fault_counts(9, 9, "t3")))
        .with_priority(10)
        .mount(&server)
        .await;

    let hook = RefreshHook::new(
        FaultTimelineSource::new(direct_chain(), vec![format!("{}/faults", server.uri())]),
        RefreshPolicy {
            history_capacity: 2,
            ..Default::default()
        },
    );
    for _ in 0..3 {
        assert_eq!(hook.refresh().await, RefreshOutcome::Success);
    }

    let points = timeline_points(&hook.history());
    let stamps: Vec<&str> = points.iter().map(|p| p.timestamp.as_str()).collect();
    assert_eq!(stamps, vec!["t2", "t3"]);
    assert_eq!(points[1].values["stationA_5s"], 9);
}

#[tokio::test]
async fn test_dashboard_compares_real_data() {
    let server = MockServer::start().await;
    mount_json(&server, "/fault", json!({"S1": frame_record(90, 100)})).await;
    mount_json(&server, "/balena", json!({"S1": balena_record(1000, 50)})).await;
    mount_json(&server, "/cleaning", json!({"S2": frame_record(10, 10)})).await;
    mount_json(&server, "/fault_timeline", fault_counts(1, 0, "t")).await;
    Mock::given(method("GET"))
        .and(path("/onboarding"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Center\nDelhi\n"))
        .mount(&server)
        .await;

    let dashboard = Dashboard::from_config(&offline_config(&server.uri())).unwrap();
    let outcomes = dashboard.refresh_all().await;

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes
        .iter()
        .all(|(_, outcome)| *outcome == RefreshOutcome::Success));

    let rows = dashboard.comparison();
    assert_eq!(rows.len(), 3);
    let flask = rows.iter().find(|r| r.location == "S1").unwrap();
    assert_eq!(flask.frames_missed, 10);
    assert_eq!(flask.missed_percentage, 10.0);
    assert!(!dashboard.is_using_mock_data(SourceKind::Cleaning));
}
