//! Circuit breaker behavior through the engine facade.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{test_config, ScriptedProbe};
use resilience_engine::{CircuitState, EngineError, ProtectError, ResilienceEngine, Status};

#[tokio::test]
async fn test_repeated_unhealthy_checks_open_the_breaker() {
    let mut config = test_config();
    config.breaker.failure_threshold = 5;
    // Keep escalation out of the way so probe calls stay countable.
    config.escalation.trip_count = 100;

    let engine = ResilienceEngine::new(config);
    let probe = Arc::new(ScriptedProbe::fixed("db", Status::Unhealthy));
    engine.register("db", probe.clone());

    for _ in 0..5 {
        let result = engine.check_now("db").await.expect("check runs");
        assert_eq!(result.status, Status::Unhealthy);
    }

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.circuit_breakers["db"].state, CircuitState::Open);
    assert_eq!(snapshot.circuit_breakers["db"].failure_count, 5);
    assert!(snapshot.circuit_breakers["db"].last_failure_time.is_some());

    // Sixth check is rejected without invoking the probe.
    let rejected = engine.check_now("db").await;
    assert!(matches!(rejected, Err(EngineError::BreakerOpen { .. })));
    assert_eq!(probe.calls(), 5);
}

#[tokio::test]
async fn test_protect_fast_rejects_while_open() {
    let mut config = test_config();
    config.breaker.failure_threshold = 1;
    config.escalation.trip_count = 100;

    let engine = ResilienceEngine::new(config);
    engine.register("api", Arc::new(ScriptedProbe::fixed("api", Status::Healthy)));

    let first: Result<(), ProtectError<String>> = engine
        .protect("api", async { Err("backend down".to_string()) })
        .await;
    assert!(matches!(first, Err(ProtectError::Inner(_))));

    let ran = AtomicBool::new(false);
    let second: Result<(), ProtectError<String>> = engine
        .protect("api", async {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
    match second {
        Err(ProtectError::Open { name, .. }) => assert_eq!(name, "api"),
        other => panic!("expected fast reject, got {other:?}"),
    }
    assert!(!ran.load(Ordering::SeqCst), "wrapped call must not run while open");
}

#[tokio::test]
async fn test_breaker_closes_after_recovery_window() {
    let mut config = test_config();
    config.breaker.failure_threshold = 1;
    config.breaker.recovery_timeout_secs = 1;
    config.escalation.trip_count = 100;

    let engine = ResilienceEngine::new(config);
    let probe = Arc::new(ScriptedProbe::new(
        "db",
        vec![Status::Unhealthy],
        Status::Healthy,
    ));
    engine.register("db", probe);

    let result = engine.check_now("db").await.expect("check runs");
    assert_eq!(result.status, Status::Unhealthy);
    assert_eq!(
        engine.snapshot().circuit_breakers["db"].state,
        CircuitState::Open
    );

    // Inside the window: still rejected.
    assert!(matches!(
        engine.check_now("db").await,
        Err(EngineError::BreakerOpen { .. })
    ));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // Past the window: half-open probe runs, succeeds, closes.
    let recovered = engine.check_now("db").await.expect("probe admitted");
    assert_eq!(recovered.status, Status::Healthy);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.circuit_breakers["db"].state, CircuitState::Closed);
    assert_eq!(snapshot.circuit_breakers["db"].failure_count, 0);
}

#[tokio::test]
async fn test_per_service_breaker_override() {
    let mut config = test_config();
    config.breaker.failure_threshold = 5;
    config.escalation.trip_count = 100;
    config
        .breakers
        .insert("fragile".to_string(), Default::default());
    config.breakers.get_mut("fragile").unwrap().failure_threshold = 1;

    let engine = ResilienceEngine::new(config);
    engine.register("fragile", Arc::new(ScriptedProbe::fixed("fragile", Status::Unhealthy)));
    engine.register("sturdy", Arc::new(ScriptedProbe::fixed("sturdy", Status::Unhealthy)));

    let _ = engine.check_now("fragile").await;
    let _ = engine.check_now("sturdy").await;

    let snapshot = engine.snapshot();
    assert_eq!(
        snapshot.circuit_breakers["fragile"].state,
        CircuitState::Open
    );
    assert_eq!(
        snapshot.circuit_breakers["sturdy"].state,
        CircuitState::Closed
    );
}
