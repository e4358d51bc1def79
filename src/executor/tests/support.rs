//! Scripted abilities and harness for executor tests.

use crate::ability::{
    domain::{
        AbilityDescriptor, AbilityName, ActionOutcome, InvocationRequest, ParameterSpec,
        ParameterType,
    },
    ports::{Ability, AbilityFault, RollbackError},
};
use crate::config::{EventBusConfig, ExecutorConfig};
use crate::events::services::EventBus;
use crate::executor::services::ActionExecutor;
use crate::registry::services::{CapabilityRegistry, RegisterAbilityRequest};
use async_trait::async_trait;
use mockable::DefaultClock;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observations shared by every scripted ability in a test.
#[derive(Default)]
pub(super) struct Recorder {
    active: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl Recorder {
    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(super) fn log(&self) -> Vec<String> {
        self.log.lock().expect("recorder log").clone()
    }

    fn push(&self, line: String) {
        self.log.lock().expect("recorder log").push(line);
    }
}

/// How a scripted ability answers rollback calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RollbackBehaviour {
    Unsupported,
    Succeeds,
    Fails,
}

/// Ability driven by request parameters:
/// `tag` labels log lines, `mode` selects `ok`, `fail`, `panic` or `fault`,
/// `delay_ms` sleeps before answering and `block_ms` blocks the worker
/// thread, ignoring cancellation.
pub(super) struct ScriptedAbility {
    descriptor: AbilityDescriptor,
    recorder: Arc<Recorder>,
    rollback: RollbackBehaviour,
}

impl ScriptedAbility {
    pub(super) fn new(
        ability: &str,
        recorder: Arc<Recorder>,
        rollback: RollbackBehaviour,
    ) -> Self {
        let descriptor = AbilityDescriptor::new(name(ability), "1.0.0")
            .with_action("run")
            .with_parameter(
                ParameterSpec::new("tag", ParameterType::String)
                    .expect("valid spec")
                    .optional(),
            )
            .with_parameter(
                ParameterSpec::new("mode", ParameterType::String)
                    .expect("valid spec")
                    .with_default(json!("ok"))
                    .with_allowed_values([
                        json!("ok"),
                        json!("fail"),
                        json!("panic"),
                        json!("fault"),
                    ]),
            )
            .with_parameter(
                ParameterSpec::new("delay_ms", ParameterType::Integer)
                    .expect("valid spec")
                    .optional(),
            )
            .with_parameter(
                ParameterSpec::new("block_ms", ParameterType::Integer)
                    .expect("valid spec")
                    .optional(),
            )
            .with_parameter(
                ParameterSpec::new("count", ParameterType::Integer)
                    .expect("valid spec")
                    .optional(),
            );
        Self {
            descriptor,
            recorder,
            rollback,
        }
    }
}

fn tag_of(request: &InvocationRequest) -> String {
    request
        .parameter("tag")
        .and_then(|value| value.as_str())
        .unwrap_or("untagged")
        .to_owned()
}

struct ActiveGuard<'a>(&'a Recorder);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ability for ScriptedAbility {
    fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    async fn execute_action(
        &self,
        request: &InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault> {
        let now_active = self.recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.recorder);
        self.recorder.peak.fetch_max(now_active, Ordering::SeqCst);
        let tag = tag_of(request);
        self.recorder.push(format!("execute:{tag}"));

        if let Some(delay) = request.parameter("delay_ms").and_then(|value| value.as_u64()) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(block) = request.parameter("block_ms").and_then(|value| value.as_u64()) {
            std::thread::sleep(Duration::from_millis(block));
        }

        match request.parameter("mode").and_then(|value| value.as_str()) {
            Some("fail") => Ok(ActionOutcome::failure(format!("{tag} refused"))),
            Some("panic") => panic!("scripted panic in {tag}"),
            Some("fault") => Err(AbilityFault::contract(format!("{tag} broke the contract"))),
            _ => Ok(ActionOutcome::success(serde_json::Map::new())
                .with_field("tag", json!(tag))
                .with_field("value", json!(tag.len()))),
        }
    }

    fn supports_rollback(&self) -> bool {
        self.rollback != RollbackBehaviour::Unsupported
    }

    async fn rollback(&self, request: &InvocationRequest) -> Result<(), RollbackError> {
        let tag = tag_of(request);
        self.recorder.push(format!("rollback:{tag}"));
        match self.rollback {
            RollbackBehaviour::Succeeds => Ok(()),
            RollbackBehaviour::Fails => Err(RollbackError::Failed(format!("{tag} stuck"))),
            RollbackBehaviour::Unsupported => Err(RollbackError::Unsupported(name("unused"))),
        }
    }
}

pub(super) fn name(value: &str) -> AbilityName {
    AbilityName::new(value).expect("valid ability name")
}

pub(super) fn request(ability: &str, tag: &str) -> InvocationRequest {
    InvocationRequest::new(name(ability), "run", "tester", &DefaultClock)
        .expect("valid request")
        .with_parameter("tag", json!(tag))
}

/// Registry, bus and executor wired together over the real clock.
pub(super) struct Harness {
    pub(super) bus: Arc<EventBus<DefaultClock>>,
    pub(super) registry: Arc<CapabilityRegistry<DefaultClock>>,
    pub(super) executor: ActionExecutor<DefaultClock>,
    pub(super) recorder: Arc<Recorder>,
}

impl Harness {
    pub(super) fn new(config: ExecutorConfig) -> Self {
        let clock = Arc::new(DefaultClock);
        let bus = Arc::new(EventBus::new(&EventBusConfig::default(), Arc::clone(&clock)));
        let registry = Arc::new(
            CapabilityRegistry::new(Arc::clone(&clock)).with_event_bus(Arc::clone(&bus)),
        );
        let executor =
            ActionExecutor::new(Arc::clone(&registry), Arc::clone(&bus), config, clock);
        Self {
            bus,
            registry,
            executor,
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub(super) async fn with_ability(self, ability: &str, rollback: RollbackBehaviour) -> Self {
        let scripted = ScriptedAbility::new(ability, Arc::clone(&self.recorder), rollback);
        self.registry
            .register(RegisterAbilityRequest::from_ability(Arc::new(scripted)))
            .await
            .expect("registration succeeds");
        self
    }
}
