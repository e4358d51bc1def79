//! Then steps for batch execution BDD scenarios.

use super::world::BatchWorld;
use ability_engine::{
    ability::domain::ErrorKind,
    executor::domain::{BatchStatus, NotStartedReason, RollbackStatus},
};
use rstest_bdd_macros::then;

#[then(r#"request "{label}" succeeded"#)]
fn request_succeeded(world: &BatchWorld, label: String) -> Result<(), eyre::Report> {
    let id = world.request(&label)?.id();
    let entry = world
        .outcome()?
        .entry(id)
        .ok_or_else(|| eyre::eyre!("no entry for request {label}"))?;
    eyre::ensure!(entry.is_success(), "request {label} did not succeed: {entry:?}");
    Ok(())
}

#[then(r#"request "{label}" failed with "{kind}""#)]
fn request_failed_with(
    world: &BatchWorld,
    label: String,
    kind: String,
) -> Result<(), eyre::Report> {
    let expected = ErrorKind::try_from(kind.as_str())
        .map_err(|err| eyre::eyre!("invalid expected kind in scenario: {err}"))?;
    let id = world.request(&label)?.id();
    let actual = world
        .outcome()?
        .entry(id)
        .and_then(|entry| entry.result())
        .and_then(|result| result.error_kind());
    eyre::ensure!(
        actual == Some(expected),
        "expected {label} to fail with {expected}, found {actual:?}"
    );
    Ok(())
}

#[then(r#"request "{label}" never started"#)]
fn request_never_started(world: &BatchWorld, label: String) -> Result<(), eyre::Report> {
    let id = world.request(&label)?.id();
    let reason = world
        .outcome()?
        .entry(id)
        .and_then(|entry| entry.not_started_reason());
    eyre::ensure!(
        reason == Some(NotStartedReason::HaltedAfterFailure),
        "expected {label} to be halted, found {reason:?}"
    );
    eyre::ensure!(
        !world.recorder.saw(&format!("post:{label}")),
        "{label} was posted"
    );
    Ok(())
}

#[then(r#"request "{label}" was rolled back"#)]
fn request_rolled_back(world: &BatchWorld, label: String) -> Result<(), eyre::Report> {
    let id = world.request(&label)?.id();
    let status = world.outcome()?.rollback_for(id).map(|record| record.status);
    eyre::ensure!(
        status == Some(RollbackStatus::RolledBack),
        "expected {label} to be rolled back, found {status:?}"
    );
    eyre::ensure!(world.recorder.saw(&format!("undo:{label}")), "{label} was not undone");
    Ok(())
}

#[then(r#"the batch status is "{status}""#)]
fn batch_status_is(world: &BatchWorld, status: String) -> Result<(), eyre::Report> {
    let actual: BatchStatus = world.outcome()?.status;
    eyre::ensure!(
        actual.as_str() == status,
        "expected batch status {status}, found {actual}"
    );
    Ok(())
}

#[then("the results follow submission order")]
fn results_in_order(world: &BatchWorld) -> Result<(), eyre::Report> {
    let expected: Vec<_> = world
        .requests
        .iter()
        .map(|(_, request)| request.id())
        .collect();
    let actual: Vec<_> = world
        .outcome()?
        .entries
        .iter()
        .map(|entry| entry.request_id())
        .collect();
    eyre::ensure!(actual == expected, "results out of order");
    Ok(())
}

#[then("at most {limit:u64} invocations ran at once")]
fn bounded_concurrency(world: &BatchWorld, limit: u64) -> Result<(), eyre::Report> {
    let peak = u64::try_from(world.recorder.peak())?;
    eyre::ensure!(peak <= limit, "peak concurrency {peak} exceeded {limit}");
    Ok(())
}
