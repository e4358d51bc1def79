//! When steps for chain execution BDD scenarios.

use super::world::{ChainWorld, ability_name, run_async};
use ability_engine::chain::domain::{ChainDefinition, ChainInput, ChainStep, StepPredicate};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::json;

#[when("the chain runs")]
fn chain_runs(world: &mut ChainWorld) -> Result<(), eyre::Report> {
    let field = world
        .transform_field
        .clone()
        .ok_or_else(|| eyre::eyre!("no chain was described"))?;

    let mut fetch = ChainStep::new("fetch", ability_name("fetch")?, "run");
    if world.fetch_fails {
        fetch = fetch.with_value("fail", json!(true));
    }
    let mut transform = ChainStep::new("transform", ability_name("transform")?, "run")
        .with_step_output("input", "fetch", field.as_str());
    if let Some(status) = &world.required_status {
        transform = transform.when(StepPredicate::field_equals("fetch", "status", json!(status)));
    }
    let store = ChainStep::new("store", ability_name("store")?, "run")
        .with_step_output("payload", "transform", "value");

    let chain = ChainDefinition::builder("scenario")
        .step(fetch)
        .step(transform)
        .step(store)
        .build()
        .wrap_err("build chain")?;
    let input = ChainInput::new("scenario").wrap_err("build chain input")?;

    let run = run_async(world.engine()?.run_chain(&chain, &input)).wrap_err("run chain")?;
    world.run = Some(run);
    Ok(())
}
