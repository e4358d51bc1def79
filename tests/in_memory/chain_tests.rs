//! Chains driven through the engine facade.

use super::helpers::{Journal, engine, entries, journal, name, register_ledger};
use ability_engine::{
    AbilityEngine,
    chain::{
        domain::{ChainDefinition, ChainInput, ChainStatus, ChainStep, StepId, StepPredicate, StepStatus},
        services::ChainError,
    },
};
use rstest::rstest;
use serde_json::json;

fn bookkeeping() -> ChainDefinition {
    ChainDefinition::builder("bookkeeping")
        .step(ChainStep::new("open", name("ledger"), "post").with_input("entry", "account"))
        .step(
            ChainStep::new("mirror", name("ledger"), "post")
                .with_step_output("entry", "open", "entry")
                .with_step_output("amount", "open", "balance")
                .when(StepPredicate::input_present("mirror")),
        )
        .build()
        .expect("valid chain")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn chain_passes_results_between_steps(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    let input = ChainInput::new("integration")
        .expect("valid caller")
        .with_value("account", json!("savings"))
        .with_value("mirror", json!(true));

    let run = engine.run_chain(&bookkeeping(), &input).await.expect("engine running");

    assert_eq!(run.status, ChainStatus::Succeeded);
    assert_eq!(entries(&journal), vec!["post:savings", "post:savings"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn predicate_skips_optional_steps(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    let input = ChainInput::new("integration")
        .expect("valid caller")
        .with_value("account", json!("current"));

    let run = engine.run_chain(&bookkeeping(), &input).await.expect("engine running");

    assert_eq!(run.status, ChainStatus::Succeeded);
    assert_eq!(run.step_status(&StepId::from("mirror")), Some(StepStatus::Skipped));
    assert_eq!(entries(&journal), vec!["post:current"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_input_reaches_validation_as_absent(engine: AbilityEngine, journal: Journal) {
    register_ledger(&engine, &journal).await;
    let input = ChainInput::new("integration").expect("valid caller");

    let run = engine.run_chain(&bookkeeping(), &input).await.expect("engine running");

    assert_eq!(run.status, ChainStatus::Failed);
    assert_eq!(run.step_status(&StepId::from("open")), Some(StepStatus::Failed));
    assert_eq!(run.step_status(&StepId::from("mirror")), Some(StepStatus::NotRun));
    assert!(entries(&journal).is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shut_down_engine_refuses_chains(engine: AbilityEngine) {
    engine.shutdown().await;
    let input = ChainInput::new("integration").expect("valid caller");

    let result = engine.run_chain(&bookkeeping(), &input).await;

    assert!(matches!(result, Err(ChainError::ShutDown)));
}
