//! Tests for multi-target runs.

mod common;

use common::{MockEngine, engine_container};
use grace::platforms::DockerProbe;
use grace::runner::run_probes;
use grace::{ApiError, Error, FailurePolicy, Probe, TerminationOutcome};
use std::sync::Arc;
use std::time::Duration;

fn docker(id: &str, exit_code: i64) -> (Arc<MockEngine>, Probe) {
    let engine = Arc::new(MockEngine::new(engine_container(
        id,
        exit_code,
        false,
        None,
        Duration::from_secs(1),
    )));
    let probe = Probe::Docker(DockerProbe::new(engine.clone(), id));
    (engine, probe)
}

fn broken(id: &str) -> (Arc<MockEngine>, Probe) {
    let (engine, probe) = docker(id, 0);
    engine.state().stop_error = Some(ApiError::status(500, "", "daemon unavailable"));
    (engine, probe)
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_results_follow_request_order() {
    let (_, first) = docker("aaaaaaaaaaaaaaaa", 0);
    let (_, second) = docker("bbbbbbbbbbbbbbbb", 1);

    let report = run_probes(&[first, second], FailurePolicy::Abort).await.unwrap();

    assert!(report.is_success());
    let ids: Vec<&str> = report.results.iter().map(|r| r.config.id.as_str()).collect();
    assert_eq!(ids, ["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);
    assert_eq!(report.results[0].outcome(), TerminationOutcome::GracefulSuccess);
    assert_eq!(report.results[1].outcome(), TerminationOutcome::GracefulError);
}

// =============================================================================
// Failure Policies
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_abort_stops_at_first_failure() {
    let (_, first) = docker("aaaaaaaaaaaaaaaa", 0);
    let (_, failing) = broken("bbbbbbbbbbbbbbbb");
    let (last_engine, last) = docker("cccccccccccccccc", 0);

    let err = run_probes(&[first, failing, last], FailurePolicy::Abort)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StopFailed { .. }));
    assert_eq!(last_engine.state().stop_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_isolate_continues_past_failure() {
    let (_, first) = docker("aaaaaaaaaaaaaaaa", 0);
    let (_, failing) = broken("bbbbbbbbbbbbbbbb");
    let (last_engine, last) = docker("cccccccccccccccc", 137);

    let report = run_probes(&[first, failing, last], FailurePolicy::Isolate)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].target.contains("bbbbbbbbbbbbbbbb"));
    assert!(matches!(report.failures[0].error, Error::StopFailed { .. }));
    assert_eq!(last_engine.state().stop_calls, 1);
}

#[test]
fn test_default_policy_aborts() {
    assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
}
