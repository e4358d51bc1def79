//! Given steps for batch execution BDD scenarios.

use super::world::{BatchWorld, ledger, ledger_name, run_async};
use ability_engine::{
    AbilityEngine,
    ability::domain::InvocationRequest,
    config::{EngineConfig, ExecutorConfig},
    registry::services::RegisterAbilityRequest,
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use serde_json::{Value, json};
use std::sync::Arc;

#[given("an engine allowing {limit:u64} concurrent invocations")]
fn engine_with_limit(world: &mut BatchWorld, limit: u64) -> Result<(), eyre::Report> {
    let max_in_flight = usize::try_from(limit).wrap_err("limit fits in usize")?;
    let config = EngineConfig {
        executor: ExecutorConfig::default().with_max_in_flight(max_in_flight),
        ..EngineConfig::default()
    };
    world.engine = Some(AbilityEngine::new(config).wrap_err("build engine")?);
    Ok(())
}

fn register_ledger(world: &BatchWorld, rollback_fails: bool) -> Result<(), eyre::Report> {
    let ability = ledger(&world.recorder, rollback_fails)?;
    run_async(
        world
            .engine()?
            .register(RegisterAbilityRequest::from_ability(Arc::new(ability))),
    )
    .wrap_err("register ledger")
}

#[given("a ledger ability that supports rollback")]
fn ledger_with_rollback(world: &mut BatchWorld) -> Result<(), eyre::Report> {
    register_ledger(world, false)
}

#[given("a ledger ability whose rollback fails")]
fn ledger_with_failing_rollback(world: &mut BatchWorld) -> Result<(), eyre::Report> {
    register_ledger(world, true)
}

fn push_request(
    world: &mut BatchWorld,
    label: String,
    extra: Option<(&str, Value)>,
) -> Result<(), eyre::Report> {
    let mut request = InvocationRequest::new(ledger_name()?, "post", "scenario", &DefaultClock)
        .wrap_err("build request")?
        .with_parameter("label", json!(label));
    if let Some((parameter, value)) = extra {
        request = request.with_parameter(parameter, value);
    }
    world.requests.push((label, request));
    Ok(())
}

#[given(r#"request "{label}" posts normally"#)]
fn posts_normally(world: &mut BatchWorld, label: String) -> Result<(), eyre::Report> {
    push_request(world, label, None)
}

#[given(r#"request "{label}" posts a malformed amount"#)]
fn posts_malformed_amount(world: &mut BatchWorld, label: String) -> Result<(), eyre::Report> {
    push_request(world, label, Some(("amount", json!("twelve"))))
}

#[given(r#"request "{label}" posts slowly for {delay:u64} ms"#)]
fn posts_slowly(world: &mut BatchWorld, label: String, delay: u64) -> Result<(), eyre::Report> {
    push_request(world, label, Some(("delay_ms", json!(delay))))
}

#[given(r#"request "{label}" is refused by the ledger"#)]
fn refused(world: &mut BatchWorld, label: String) -> Result<(), eyre::Report> {
    push_request(world, label, Some(("refuse", json!(true))))
}
