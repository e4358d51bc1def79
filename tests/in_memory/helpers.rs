//! Shared abilities and fixtures for in-memory integration tests.

use ability_engine::{
    AbilityEngine,
    ability::{
        adapters::FunctionAbility,
        domain::{
            AbilityDescriptor, AbilityName, ActionOutcome, InvocationRequest, ParameterSpec,
            ParameterType,
        },
        ports::{AbilityFault, RollbackError},
    },
    config::EngineConfig,
    registry::services::RegisterAbilityRequest,
};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Ordered record of what the test abilities were asked to do.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Builds a validated ability name.
///
/// # Panics
///
/// Panics if `value` is not a valid ability name.
#[must_use]
pub fn name(value: &str) -> AbilityName {
    AbilityName::new(value).expect("valid ability name")
}

/// Builds a request to `ability.action` on behalf of the test caller.
///
/// # Panics
///
/// Panics if `action` is blank.
#[must_use]
pub fn request(ability: &str, action: &str) -> InvocationRequest {
    InvocationRequest::new(name(ability), action, "integration", &DefaultClock)
        .expect("valid request")
}

/// Provides an engine with default configuration.
///
/// # Panics
///
/// Panics if the default configuration is rejected.
#[fixture]
pub fn engine() -> AbilityEngine {
    AbilityEngine::new(EngineConfig::default()).expect("default config is valid")
}

/// Provides an empty journal.
#[fixture]
pub fn journal() -> Journal {
    Journal::default()
}

fn note(journal: &Journal, line: String) {
    journal.lock().expect("journal lock").push(line);
}

/// A `ledger` ability: `post` records an entry and can be undone.
///
/// Negative amounts are refused as a domain failure.
///
/// # Panics
///
/// Panics if the static parameter specs are invalid.
#[must_use]
pub fn ledger(journal: &Journal) -> FunctionAbility {
    let descriptor = AbilityDescriptor::new(name("ledger"), "2.1.0")
        .with_description("Posts entries to an in-memory ledger")
        .with_action("post")
        .with_parameter(ParameterSpec::new("entry", ParameterType::String).expect("valid spec"))
        .with_parameter(
            ParameterSpec::new("amount", ParameterType::Integer)
                .expect("valid spec")
                .with_default(json!(1)),
        );
    let posts = Arc::clone(journal);
    let undo = Arc::clone(journal);
    FunctionAbility::new(descriptor, move |request: InvocationRequest| {
        let journal = Arc::clone(&posts);
        async move {
            let entry = request
                .parameter("entry")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_owned();
            let amount = request
                .parameter("amount")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(1);
            if amount < 0 {
                return Ok(ActionOutcome::failure(format!("{entry}: negative amount")));
            }
            note(&journal, format!("post:{entry}"));
            Ok::<_, AbilityFault>(
                ActionOutcome::success(serde_json::Map::new())
                    .with_field("entry", json!(entry))
                    .with_field("balance", json!(amount)),
            )
        }
    })
    .with_rollback(move |request: InvocationRequest| {
        let journal = Arc::clone(&undo);
        async move {
            let entry = request
                .parameter("entry")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_owned();
            note(&journal, format!("undo:{entry}"));
            Ok::<_, RollbackError>(())
        }
    })
}

/// Registers the ledger ability with `engine`.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn register_ledger(engine: &AbilityEngine, journal: &Journal) {
    engine
        .register(RegisterAbilityRequest::from_ability(Arc::new(ledger(journal))))
        .await
        .expect("ledger registers");
}

/// Returns a snapshot of the journal.
///
/// # Panics
///
/// Panics if the journal lock is poisoned.
#[must_use]
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal lock").clone()
}
