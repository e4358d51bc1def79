//! Shared world state for batch execution BDD scenarios.

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
    executor::domain::BatchOutcome,
};
use rstest::fixture;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Concurrency and call observations made by the ledger ability.
#[derive(Debug, Default)]
pub struct LedgerRecorder {
    active: AtomicUsize,
    peak: AtomicUsize,
    journal: Mutex<Vec<String>>,
}

impl LedgerRecorder {
    /// Highest number of simultaneously active posts.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Returns whether `line` was journalled.
    pub fn saw(&self, line: &str) -> bool {
        self.journal
            .lock()
            .map(|journal| journal.iter().any(|entry| entry == line))
            .unwrap_or(false)
    }

    fn note(&self, line: String) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(line);
        }
    }
}

/// Scenario world for batch execution behaviour tests.
#[derive(Default)]
pub struct BatchWorld {
    pub engine: Option<AbilityEngine>,
    pub recorder: Arc<LedgerRecorder>,
    pub requests: Vec<(String, InvocationRequest)>,
    pub outcome: Option<BatchOutcome>,
}

impl BatchWorld {
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

    /// Returns the batch outcome recorded by the When step.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch has not run.
    pub fn outcome(&self) -> Result<&BatchOutcome, eyre::Report> {
        self.outcome
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing batch outcome in scenario world"))
    }

    /// Looks up the request labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns an error when no request carries that label.
    pub fn request(&self, label: &str) -> Result<&InvocationRequest, eyre::Report> {
        self.requests
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, request)| request)
            .ok_or_else(|| eyre::eyre!("no request labelled {label}"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BatchWorld {
    BatchWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Name of the ledger ability.
///
/// # Errors
///
/// Returns an error if the name is rejected.
pub fn ledger_name() -> Result<AbilityName, eyre::Report> {
    AbilityName::new("ledger").map_err(|err| eyre::eyre!("invalid ability name: {err}"))
}

struct ActiveGuard<'a>(&'a LedgerRecorder);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builds the ledger ability used by every batch scenario.
///
/// `post` journals `post:<label>` after an optional delay; `refuse: true`
/// makes it report a domain failure. Rollback journals `undo:<label>` and
/// fails when `rollback_fails` is set.
///
/// # Errors
///
/// Returns an error if the descriptor's parameter specs are rejected.
pub fn ledger(
    recorder: &Arc<LedgerRecorder>,
    rollback_fails: bool,
) -> Result<FunctionAbility, eyre::Report> {
    let spec = |name: &str, kind: ParameterType| {
        ParameterSpec::new(name, kind).map_err(|err| eyre::eyre!("invalid spec {name}: {err}"))
    };
    let descriptor = AbilityDescriptor::new(ledger_name()?, "1.0.0")
        .with_action("post")
        .with_parameter(spec("label", ParameterType::String)?)
        .with_parameter(spec("amount", ParameterType::Integer)?.optional())
        .with_parameter(spec("delay_ms", ParameterType::Integer)?.optional())
        .with_parameter(spec("refuse", ParameterType::Boolean)?.optional());

    let posts = Arc::clone(recorder);
    let undo = Arc::clone(recorder);
    let ability = FunctionAbility::new(descriptor, move |request: InvocationRequest| {
        let recorder = Arc::clone(&posts);
        async move {
            let now_active = recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = ActiveGuard(&recorder);
            recorder.peak.fetch_max(now_active, Ordering::SeqCst);
            let label = label_of(&request);
            let delay = request.parameter("delay_ms").and_then(serde_json::Value::as_u64);
            if let Some(millis) = delay {
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
            if request.parameter("refuse") == Some(&json!(true)) {
                let refusal = ActionOutcome::failure(format!("{label} refused"));
                return Ok::<_, AbilityFault>(refusal);
            }
            recorder.note(format!("post:{label}"));
            Ok::<_, AbilityFault>(
                ActionOutcome::success(serde_json::Map::new()).with_field("label", json!(label)),
            )
        }
    })
    .with_rollback(move |request: InvocationRequest| {
        let recorder = Arc::clone(&undo);
        async move {
            let label = label_of(&request);
            recorder.note(format!("undo:{label}"));
            if rollback_fails {
                return Err(RollbackError::Failed(format!("{label} is settled")));
            }
            Ok(())
        }
    });
    Ok(ability)
}

fn label_of(request: &InvocationRequest) -> String {
    request
        .parameter("label")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unlabelled")
        .to_owned()
}
