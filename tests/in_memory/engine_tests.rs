//! Engine facade: configuration, invocations, batches and shutdown.

use super::helpers::{Journal, engine, entries, journal, ledger, name, register_ledger, request};
use ability_engine::{
    AbilityEngine, EngineError,
    ability::domain::ErrorKind,
    config::ConfigError,
    events::domain::EventKind,
    executor::{
        domain::{BatchStatus, ExecutionBatch, RollbackPolicy, RollbackStatus},
        services::ExecutorError,
    },
    registry::{domain::EntryState, services::{RegisterAbilityRequest, RegistryError}},
};
use rstest::rstest;
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

#[test]
fn engine_builds_from_json_configuration() {
    let engine = AbilityEngine::from_json_str(
        r#"{ "executor": { "max_in_flight": 3, "default_timeout_ms": null }, "events": { "history_capacity": 10 } }"#,
    )
    .expect("valid configuration");

    assert_eq!(engine.config().executor.max_in_flight, 3);
    assert_eq!(engine.config().executor.default_timeout(), None);
    assert_eq!(engine.config().events.history_capacity, 10);
}

#[rstest]
#[case(r#"{ "executor": { "max_in_flight": 0 } }"#, ConfigError::ZeroMaxInFlight)]
#[case(
    r#"{ "executor": { "default_timeout_ms": 0 } }"#,
    ConfigError::ZeroTimeout("executor.default_timeout_ms")
)]
fn invalid_configuration_is_rejected(#[case] document: &str, #[case] expected: ConfigError) {
    let result = AbilityEngine::from_json_str(document);

    assert!(matches!(result, Err(EngineError::Config(err)) if err == expected));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn single_invocation_applies_declared_defaults(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;

    let result = engine
        .invoke(&request("ledger", "post").with_parameter("entry", json!("rent")))
        .await
        .expect("engine running");

    assert!(result.is_success());
    assert_eq!(result.data().get("balance"), Some(&json!(1)));
    assert_eq!(entries(&journal), vec!["post:rent"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_registration_keeps_the_first_ability(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    let other = Journal::default();

    let second = engine
        .register(RegisterAbilityRequest::from_ability(Arc::new(ledger(&other))))
        .await;

    assert!(matches!(second, Err(RegistryError::DuplicateName(_))));
    engine
        .invoke(&request("ledger", "post").with_parameter("entry", json!("first")))
        .await
        .expect("engine running");
    assert_eq!(entries(&journal), vec!["post:first"]);
    assert!(entries(&other).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn all_or_nothing_batch_undoes_completed_posts(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    let batch = ExecutionBatch::sequential(vec![
        request("ledger", "post").with_parameter("entry", json!("a")),
        request("ledger", "post").with_parameter("entry", json!("b")),
        request("ledger", "post")
            .with_parameter("entry", json!("c"))
            .with_parameter("amount", json!(-5)),
        request("ledger", "post").with_parameter("entry", json!("d")),
    ])
    .expect("valid batch")
    .with_rollback(RollbackPolicy::AllOrNothing);

    let outcome = engine.run_batch(&batch).await.expect("engine running");

    assert_eq!(outcome.status, BatchStatus::Failed);
    assert_eq!(outcome.entries.len(), 4);
    assert_eq!(
        entries(&journal),
        vec!["post:a", "post:b", "undo:b", "undo:a"]
    );
    assert!(outcome
        .rollbacks
        .iter()
        .all(|record| record.status == RollbackStatus::RolledBack));
    let failed = outcome
        .results()
        .find(|result| !result.is_success())
        .and_then(|result| result.error_kind());
    assert_eq!(failed, Some(ErrorKind::Ability));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_observe_every_phase(engine: AbilityEngine, journal: Journal) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    engine
        .events()
        .subscribe_kind(EventKind::InvocationSucceeded, move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("subscribe");
    register_ledger(&engine, &journal).await;

    let batch = ExecutionBatch::concurrent(vec![
        request("ledger", "post").with_parameter("entry", json!("x")),
        request("ledger", "post").with_parameter("entry", json!("y")),
    ])
    .expect("valid batch");
    engine.run_batch(&batch).await.expect("engine running");

    assert_eq!(seen.load(Ordering::SeqCst), 2);
    let kinds: Vec<EventKind> = engine
        .events()
        .history(None, None)
        .into_iter()
        .map(|event| event.kind())
        .collect();
    assert!(kinds.contains(&EventKind::AbilityRegistered));
    assert!(kinds.contains(&EventKind::AbilityInitialized));
    assert!(kinds.contains(&EventKind::BatchStarted));
    assert_eq!(kinds.first(), Some(&EventKind::BatchCompleted));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_everything(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    engine
        .invoke(&request("ledger", "post").with_parameter("entry", json!("warm")))
        .await
        .expect("engine running");

    let failures = engine.shutdown().await;

    assert!(failures.is_empty());
    assert_eq!(
        engine.registry().entry_state(&name("ledger")),
        Some(EntryState::Shutdown)
    );
    assert!(engine.events().is_closed());
    let refused = engine
        .invoke(&request("ledger", "post").with_parameter("entry", json!("late")))
        .await;
    assert!(matches!(refused, Err(ExecutorError::ShutDown)));
}
