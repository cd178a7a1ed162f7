//! End-to-end escalation and recovery through the engine.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{fast_recovery, test_config, CountingHooks, ScriptedProbe};
use resilience_engine::recovery::RecoveryAction;
use resilience_engine::{ResilienceEngine, Status};

#[tokio::test]
async fn test_failure_streak_triggers_hooks_and_recovers() {
    let mut config = test_config();
    config.escalation.trip_count = 1;

    let engine = ResilienceEngine::new(config);
    let probe = Arc::new(ScriptedProbe::new(
        "api",
        vec![Status::Unhealthy],
        Status::Healthy,
    ));
    let hooks = Arc::new(CountingHooks::default());
    engine.register_with_hooks("api", probe, hooks.clone());

    let result = engine.check_now("api").await.expect("check");
    assert_eq!(result.status, Status::Unhealthy);

    // Recovery runs in the background: reconnect, then verification
    // sees the probe healthy again.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(hooks.reconnects.load(Ordering::SeqCst), 1);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.services["api"].status, Status::Healthy);
    assert_eq!(snapshot.services["api"].consecutive_failures, 0);
}

#[tokio::test]
async fn test_streak_below_trip_point_does_not_recover() {
    let mut config = test_config();
    config.escalation.trip_count = 3;

    let engine = ResilienceEngine::new(config);
    let probe = Arc::new(ScriptedProbe::new(
        "api",
        vec![Status::Unhealthy, Status::Unhealthy],
        Status::Healthy,
    ));
    let hooks = Arc::new(CountingHooks::default());
    engine.register_with_hooks("api", probe, hooks.clone());

    for _ in 0..2 {
        let _ = engine.check_now("api").await.expect("check");
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(hooks.reconnects.load(Ordering::SeqCst), 0);
    assert_eq!(engine.snapshot().services["api"].consecutive_failures, 2);
}

#[tokio::test]
async fn test_fallback_mode_set_when_service_stays_down() {
    let mut config = test_config();
    config.escalation.trip_count = 1;
    config.breaker.failure_threshold = 100;
    config.recovery = fast_recovery(vec![RecoveryAction::FallbackMode], 1);

    let engine = ResilienceEngine::new(config);
    engine.register("api", Arc::new(ScriptedProbe::fixed("api", Status::Unhealthy)));

    let _ = engine.check_now("api").await.expect("check");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Verification still sees the service down, so fallback mode
    // stays engaged.
    assert!(engine.fallback_active("api"));
}

#[tokio::test]
async fn test_fallback_mode_cleared_once_service_returns() {
    let mut config = test_config();
    config.escalation.trip_count = 1;
    config.breaker.failure_threshold = 100;
    config.recovery = fast_recovery(
        vec![RecoveryAction::FallbackMode, RecoveryAction::WaitAndRetry],
        2,
    );

    let engine = ResilienceEngine::new(config);
    let probe = Arc::new(ScriptedProbe::new(
        "api",
        vec![Status::Unhealthy, Status::Unhealthy],
        Status::Healthy,
    ));
    engine.register("api", probe);

    let _ = engine.check_now("api").await.expect("check");
    // First attempt verifies against the still-failing probe; the
    // second verification sees it healthy and clears fallback mode.
    // Wait-and-retry backoff dominates the timing here.
    tokio::time::sleep(Duration::from_millis(3000)).await;

    assert!(!engine.fallback_active("api"));
    assert_eq!(engine.snapshot().services["api"].status, Status::Healthy);
}
