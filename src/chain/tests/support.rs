//! Abilities and wiring shared by chain tests.

use crate::ability::{
    adapters::FunctionAbility,
    domain::{
        AbilityDescriptor, AbilityName, ActionOutcome, InvocationRequest, ParameterSpec,
        ParameterType,
    },
    ports::AbilityFault,
};
use crate::chain::services::ChainExecutor;
use crate::config::{EventBusConfig, ExecutorConfig};
use crate::events::services::EventBus;
use crate::registry::services::{CapabilityRegistry, RegisterAbilityRequest};
use mockable::DefaultClock;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub(super) fn name(value: &str) -> AbilityName {
    AbilityName::new(value).expect("valid ability name")
}

/// Every request that reached an ability, in arrival order.
pub(super) type CallLog = Arc<Mutex<Vec<InvocationRequest>>>;

pub(super) struct Harness {
    pub(super) bus: Arc<EventBus<DefaultClock>>,
    pub(super) executor: ChainExecutor<DefaultClock>,
    pub(super) calls: CallLog,
}

impl Harness {
    /// Requests received by `ability`.
    pub(super) fn calls_to(&self, ability: &str) -> Vec<InvocationRequest> {
        self.calls
            .lock()
            .expect("call log")
            .iter()
            .filter(|request| request.ability().as_str() == ability)
            .cloned()
            .collect()
    }
}

fn record(calls: &CallLog, request: &InvocationRequest) {
    calls.lock().expect("call log").push(request.clone());
}

/// `fetch` returns a fixed document, or fails when `fail` is true.
fn fetch(calls: CallLog) -> FunctionAbility {
    let descriptor = AbilityDescriptor::new(name("fetch"), "1.0.0")
        .with_action("run")
        .with_parameter(
            ParameterSpec::new("fail", ParameterType::Boolean)
                .expect("valid spec")
                .optional(),
        );
    FunctionAbility::new(descriptor, move |request: InvocationRequest| {
        let log = Arc::clone(&calls);
        async move {
            record(&log, &request);
            if request.parameter("fail") == Some(&json!(true)) {
                return Ok::<_, AbilityFault>(ActionOutcome::failure("source unavailable"));
            }
            Ok::<_, AbilityFault>(ActionOutcome::success(serde_json::Map::new())
                .with_field("value", json!(21))
                .with_field("status", json!("fresh"))
                .with_field("meta", json!({ "tags": ["alpha", "beta"] })))
        }
    })
}

/// `transform` doubles its required integer `input`.
fn transform(calls: CallLog) -> FunctionAbility {
    let descriptor = AbilityDescriptor::new(name("transform"), "1.0.0")
        .with_action("run")
        .with_parameter(ParameterSpec::new("input", ParameterType::Integer).expect("valid spec"));
    FunctionAbility::new(descriptor, move |request: InvocationRequest| {
        let log = Arc::clone(&calls);
        async move {
            record(&log, &request);
            let Some(input) = request.parameter("input").and_then(serde_json::Value::as_i64)
            else {
                return Err(AbilityFault::contract("input was validated as an integer"));
            };
            Ok(ActionOutcome::success(serde_json::Map::new()).with_field("value", json!(input * 2)))
        }
    })
}

/// `store` accepts an optional payload and note.
fn store(calls: CallLog) -> FunctionAbility {
    let descriptor = AbilityDescriptor::new(name("store"), "1.0.0")
        .with_action("run")
        .with_parameter(
            ParameterSpec::new("payload", ParameterType::Any)
                .expect("valid spec")
                .optional(),
        )
        .with_parameter(
            ParameterSpec::new("note", ParameterType::String)
                .expect("valid spec")
                .optional(),
        );
    FunctionAbility::new(descriptor, move |request: InvocationRequest| {
        let log = Arc::clone(&calls);
        async move {
            record(&log, &request);
            Ok::<_, AbilityFault>(
                ActionOutcome::success(serde_json::Map::new()).with_field("stored", json!(true)),
            )
        }
    })
}

pub(super) async fn harness() -> Harness {
    let clock = Arc::new(DefaultClock);
    let bus = Arc::new(EventBus::new(&EventBusConfig::default(), Arc::clone(&clock)));
    let registry =
        Arc::new(CapabilityRegistry::new(Arc::clone(&clock)).with_event_bus(Arc::clone(&bus)));
    let calls = CallLog::default();
    for ability in [
        fetch(Arc::clone(&calls)),
        transform(Arc::clone(&calls)),
        store(Arc::clone(&calls)),
    ] {
        registry
            .register(RegisterAbilityRequest::from_ability(Arc::new(ability)))
            .await
            .expect("registration succeeds");
    }
    let executor = ChainExecutor::new(registry, Arc::clone(&bus), ExecutorConfig::default(), clock);
    Harness {
        bus,
        executor,
        calls,
    }
}
