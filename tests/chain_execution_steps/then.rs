//! Then steps for chain execution BDD scenarios.

use super::world::ChainWorld;
use ability_engine::{chain::domain::StepId, events::domain::EventKind};
use rstest_bdd_macros::then;
use serde_json::json;

#[then(r#"the chain status is "{status}""#)]
fn chain_status_is(world: &ChainWorld, status: String) -> Result<(), eyre::Report> {
    let actual = world.run()?.status;
    eyre::ensure!(
        actual.as_str() == status,
        "expected chain status {status}, found {}",
        actual.as_str()
    );
    Ok(())
}

#[then("transform received {value:i64} as input")]
fn transform_received(world: &ChainWorld, value: i64) -> Result<(), eyre::Report> {
    let request = world.first_call("transform")?;
    eyre::ensure!(
        request.parameter("input") == Some(&json!(value)),
        "transform input was {:?}",
        request.parameter("input")
    );
    Ok(())
}

#[then("store received {value:i64} as payload")]
fn store_received(world: &ChainWorld, value: i64) -> Result<(), eyre::Report> {
    let request = world.first_call("store")?;
    eyre::ensure!(
        request.parameter("payload") == Some(&json!(value)),
        "store payload was {:?}",
        request.parameter("payload")
    );
    Ok(())
}

#[then("store received an absent payload")]
fn store_received_absent(world: &ChainWorld) -> Result<(), eyre::Report> {
    let request = world.first_call("store")?;
    eyre::ensure!(request.is_absent("payload"), "store payload was not marked absent");
    Ok(())
}

#[then(r#"step "{step}" has status "{status}""#)]
fn step_has_status(world: &ChainWorld, step: String, status: String) -> Result<(), eyre::Report> {
    let actual = world
        .run()?
        .step_status(&StepId::from(step.as_str()))
        .ok_or_else(|| eyre::eyre!("no record for step {step}"))?;
    eyre::ensure!(
        actual.as_str() == status,
        "expected step {step} to be {status}, found {}",
        actual.as_str()
    );
    Ok(())
}

#[then(r#"a skipped-step event names "{step}""#)]
fn skipped_event_names(world: &ChainWorld, step: String) -> Result<(), eyre::Report> {
    let run_id = world.run()?.run_id;
    let skipped = world
        .engine()?
        .events()
        .history(Some(EventKind::ChainStepSkipped), None);
    eyre::ensure!(
        skipped.iter().any(|event| {
            event.payload().step.as_deref() == Some(step.as_str())
                && event.payload().chain_id == Some(run_id)
        }),
        "no skipped-step event for {step}"
    );
    Ok(())
}
