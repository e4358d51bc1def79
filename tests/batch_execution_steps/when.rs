//! When steps for batch execution BDD scenarios.

use super::world::{BatchWorld, run_async};
use ability_engine::executor::domain::{ExecutionBatch, ExecutionMode, RollbackPolicy};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"the batch runs "{mode}" with "{policy}" rollback"#)]
fn batch_runs(world: &mut BatchWorld, mode: String, policy: String) -> Result<(), eyre::Report> {
    let mode = ExecutionMode::try_from(mode.as_str()).wrap_err("parse execution mode")?;
    let rollback = RollbackPolicy::try_from(policy.as_str()).wrap_err("parse rollback policy")?;
    let requests = world
        .requests
        .iter()
        .map(|(_, request)| request.clone())
        .collect();
    let batch = ExecutionBatch::new(requests, mode, rollback).wrap_err("build batch")?;

    let outcome = run_async(world.engine()?.run_batch(&batch)).wrap_err("run batch")?;
    world.outcome = Some(outcome);
    Ok(())
}
