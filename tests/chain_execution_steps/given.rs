//! Given steps for chain execution BDD scenarios.

use super::world::{ChainWorld, pipeline_abilities, run_async};
use ability_engine::{
    AbilityEngine, config::EngineConfig, registry::services::RegisterAbilityRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use std::sync::Arc;

#[given("an engine with fetch, transform and store abilities")]
fn engine_with_pipeline(world: &mut ChainWorld) -> Result<(), eyre::Report> {
    let engine = AbilityEngine::new(EngineConfig::default()).wrap_err("build engine")?;
    for ability in pipeline_abilities(&world.calls)? {
        run_async(engine.register(RegisterAbilityRequest::from_ability(Arc::new(ability))))
            .wrap_err("register pipeline ability")?;
    }
    world.engine = Some(engine);
    Ok(())
}

#[given(r#"a chain where transform reads the "{field}" field of fetch"#)]
fn transform_reads_field(world: &mut ChainWorld, field: String) -> Result<(), eyre::Report> {
    world.transform_field = Some(field);
    Ok(())
}

#[given("the fetch step is set to fail")]
fn fetch_fails(world: &mut ChainWorld) -> Result<(), eyre::Report> {
    world.fetch_fails = true;
    Ok(())
}

#[given(r#"transform only runs when fetch reports status "{status}""#)]
fn transform_guarded(world: &mut ChainWorld, status: String) -> Result<(), eyre::Report> {
    world.required_status = Some(status);
    Ok(())
}
