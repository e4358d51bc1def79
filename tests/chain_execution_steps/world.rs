//! Shared world state for chain execution BDD scenarios.

use ability_engine::{
    AbilityEngine,
    ability::{
        adapters::FunctionAbility,
        domain::{
            AbilityDescriptor, AbilityName, ActionOutcome, InvocationRequest, ParameterSpec,
            ParameterType,
        },
        ports::AbilityFault,
    },
    chain::domain::ChainRun,
};
use rstest::fixture;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Requests that reached an ability, in arrival order.
pub type CallLog = Arc<Mutex<Vec<InvocationRequest>>>;

/// Scenario world for chain execution behaviour tests.
#[derive(Default)]
pub struct ChainWorld {
    pub engine: Option<AbilityEngine>,
    pub calls: CallLog,
    pub transform_field: Option<String>,
    pub fetch_fails: bool,
    pub required_status: Option<String>,
    pub run: Option<ChainRun>,
}

impl ChainWorld {
    /// Returns the engine built by a Given step.
    ///
    /// # Errors
    ///
    /// Returns an error when no engine has been built yet.
    pub fn engine(&self) -> Result<&AbilityEngine, eyre::Report> {
        self.engine
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing engine in scenario world"))
    }

    /// Returns the chain run recorded by the When step.
    ///
    /// # Errors
    ///
    /// Returns an error when the chain has not run.
    pub fn run(&self) -> Result<&ChainRun, eyre::Report> {
        self.run
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing chain run in scenario world"))
    }

    /// Returns the first request received by `ability`.
    ///
    /// # Errors
    ///
    /// Returns an error when the call log is poisoned or `ability` never ran.
    pub fn first_call(&self, ability: &str) -> Result<InvocationRequest, eyre::Report> {
        let calls = self
            .calls
            .lock()
            .map_err(|_| eyre::eyre!("call log poisoned"))?;
        calls
            .iter()
            .find(|request| request.ability().as_str() == ability)
            .cloned()
            .ok_or_else(|| eyre::eyre!("{ability} was never invoked"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ChainWorld {
    ChainWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses an ability name for a step.
///
/// # Errors
///
/// Returns an error when the name is rejected.
pub fn ability_name(value: &str) -> Result<AbilityName, eyre::Report> {
    AbilityName::new(value).map_err(|err| eyre::eyre!("invalid ability name {value}: {err}"))
}

fn spec(name: &str, kind: ParameterType) -> Result<ParameterSpec, eyre::Report> {
    ParameterSpec::new(name, kind).map_err(|err| eyre::eyre!("invalid spec {name}: {err}"))
}

fn record(calls: &CallLog, request: &InvocationRequest) {
    if let Ok(mut log) = calls.lock() {
        log.push(request.clone());
    }
}

/// Builds the `fetch`, `transform` and `store` abilities.
///
/// # Errors
///
/// Returns an error when a descriptor cannot be built.
pub fn pipeline_abilities(calls: &CallLog) -> Result<Vec<FunctionAbility>, eyre::Report> {
    let fetch_log = Arc::clone(calls);
    let fetch = FunctionAbility::new(
        AbilityDescriptor::new(ability_name("fetch")?, "1.0.0")
            .with_action("run")
            .with_parameter(spec("fail", ParameterType::Boolean)?.optional()),
        move |request: InvocationRequest| {
            let log = Arc::clone(&fetch_log);
            async move {
                record(&log, &request);
                if request.parameter("fail") == Some(&json!(true)) {
                    return Ok::<_, AbilityFault>(ActionOutcome::failure("source unavailable"));
                }
                Ok(ActionOutcome::success(serde_json::Map::new())
                    .with_field("value", json!(21))
                    .with_field("status", json!("fresh")))
            }
        },
    );

    let transform_log = Arc::clone(calls);
    let transform = FunctionAbility::new(
        AbilityDescriptor::new(ability_name("transform")?, "1.0.0")
            .with_action("run")
            .with_parameter(spec("input", ParameterType::Integer)?),
        move |request: InvocationRequest| {
            let log = Arc::clone(&transform_log);
            async move {
                record(&log, &request);
                let Some(input) = request.parameter("input").and_then(serde_json::Value::as_i64)
                else {
                    return Err(AbilityFault::contract("input was validated as an integer"));
                };
                Ok(ActionOutcome::success(serde_json::Map::new())
                    .with_field("value", json!(input * 2)))
            }
        },
    );

    let store_log = Arc::clone(calls);
    let store = FunctionAbility::new(
        AbilityDescriptor::new(ability_name("store")?, "1.0.0")
            .with_action("run")
            .with_parameter(spec("payload", ParameterType::Any)?.optional()),
        move |request: InvocationRequest| {
            let log = Arc::clone(&store_log);
            async move {
                record(&log, &request);
                Ok::<_, AbilityFault>(
                    ActionOutcome::success(serde_json::Map::new())
                        .with_field("stored", json!(true)),
                )
            }
        },
    );

    Ok(vec![fetch, transform, store])
}
