//! Runs chain definitions step by step.

use crate::ability::domain::{
    AbilityDomainError, ErrorKind, InvocationError, InvocationRequest, InvocationResult,
};
use crate::chain::domain::{
    BindingResolution, ChainContext, ChainDefinition, ChainInput, ChainRun, ChainRunState,
    ChainStatus, ChainStep, FailurePolicy, StepRecord, StepStatus,
};
use crate::config::ExecutorConfig;
use crate::events::{
    domain::{EventKind, EventPayload},
    services::EventBus,
};
use crate::executor::services::InvocationDispatcher;
use crate::registry::services::CapabilityRegistry;
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Conditions that stop a chain run from producing an outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The executor was shut down before the run started.
    #[error("chain executor has been shut down")]
    ShutDown,

    /// A step request could not be built from the run input.
    #[error(transparent)]
    Request(#[from] AbilityDomainError),
}

/// Result type for chain execution.
pub type ChainResult<T> = Result<T, ChainError>;

/// Runs chains over the shared invocation dispatcher.
///
/// Step failures are captured in the returned [`ChainRun`]; only shutdown
/// and malformed run input are reported as errors.
pub struct ChainExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    dispatcher: Arc<InvocationDispatcher<C>>,
    shutdown: CancellationToken,
}

impl<C> std::fmt::Debug for ChainExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainExecutor")
            .field("dispatcher", &self.dispatcher)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

struct StepTally {
    failed: bool,
    aborted: bool,
}

impl<C> ChainExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a chain executor resolving abilities through `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<CapabilityRegistry<C>>,
        events: Arc<EventBus<C>>,
        config: ExecutorConfig,
        clock: Arc<C>,
    ) -> Self {
        Self::with_dispatcher(Arc::new(InvocationDispatcher::new(
            registry, events, config, clock,
        )))
    }

    /// Creates a chain executor sharing an existing dispatcher.
    #[must_use]
    pub fn with_dispatcher(dispatcher: Arc<InvocationDispatcher<C>>) -> Self {
        Self {
            dispatcher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<InvocationDispatcher<C>> {
        &self.dispatcher
    }

    /// Runs a chain to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::ShutDown`] after [`ChainExecutor::shutdown`].
    pub async fn run(&self, chain: &ChainDefinition, input: &ChainInput) -> ChainResult<ChainRun> {
        self.run_with_cancellation(chain, input, &CancellationToken::new())
            .await
    }

    /// Runs a chain, starting no further steps once `cancel` fires.
    ///
    /// A step already running completes; the remaining steps are recorded
    /// as not run and the chain status is `aborted`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::ShutDown`] after [`ChainExecutor::shutdown`].
    pub async fn run_with_cancellation(
        &self,
        chain: &ChainDefinition,
        input: &ChainInput,
        cancel: &CancellationToken,
    ) -> ChainResult<ChainRun> {
        if self.is_shut_down() {
            return Err(ChainError::ShutDown);
        }

        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let payload = EventPayload::new().with_chain(run_id);
        self.events().emit(
            EventKind::ChainStarted,
            payload
                .clone()
                .with_data("chain", json!(chain.name()))
                .with_data("steps", json!(chain.len()))
                .with_data("failure_policy", json!(chain.failure_policy().as_str())),
        );

        let mut state = ChainRunState::Pending;
        let mut context = ChainContext::new(input.values().clone());
        let mut records = Vec::with_capacity(chain.len());
        let mut tally = StepTally {
            failed: false,
            aborted: false,
        };

        for (index, step) in chain.steps().iter().enumerate() {
            state = state.advance(index);
            tracing::trace!(chain = chain.name(), step = %step.id(), ?state, "considering step");
            if self.halted(cancel) {
                tally.aborted = true;
                records.push(not_run(step, "chain cancelled"));
                continue;
            }
            if tally.failed && chain.failure_policy() == FailurePolicy::FailFast {
                records.push(not_run(step, "halted after step failure"));
                continue;
            }

            let step_payload = payload.clone().with_step(step.id().as_str());
            if let Some(predicate) = step.predicate()
                && !predicate.evaluate(&context)
            {
                let reason = format!("predicate '{predicate}' was false");
                tracing::debug!(chain = chain.name(), step = %step.id(), %reason, "step skipped");
                self.events().emit(
                    EventKind::ChainStepSkipped,
                    step_payload
                        .with_ability(step.ability().clone())
                        .with_message(reason.clone()),
                );
                context.record(step.id().clone(), StepStatus::Skipped);
                records.push(StepRecord {
                    step: step.id().clone(),
                    ability: step.ability().clone(),
                    status: StepStatus::Skipped,
                    result: None,
                    reason: Some(reason),
                });
                continue;
            }

            let result = self.run_step(step, input, &context, &step_payload).await?;
            let status = if result.is_success() {
                context.record_success(step.id().clone(), result.data().clone());
                StepStatus::Succeeded
            } else {
                tally.failed = true;
                context.record(step.id().clone(), StepStatus::Failed);
                StepStatus::Failed
            };
            records.push(StepRecord {
                step: step.id().clone(),
                ability: step.ability().clone(),
                status,
                result: Some(result),
                reason: None,
            });
        }

        let status = if tally.aborted {
            ChainStatus::Aborted
        } else if tally.failed {
            ChainStatus::Failed
        } else {
            ChainStatus::Succeeded
        };
        state = state.finish(status);

        let kind = if status == ChainStatus::Aborted {
            EventKind::ChainAborted
        } else {
            EventKind::ChainCompleted
        };
        self.events().emit(
            kind,
            payload
                .with_message(status.as_str())
                .with_data("chain", json!(chain.name()))
                .with_data("status", json!(status.as_str())),
        );
        tracing::debug!(chain = chain.name(), %run_id, ?state, "chain finished");

        Ok(ChainRun {
            run_id,
            chain: chain.name().to_owned(),
            status,
            steps: records,
            duration: started.elapsed(),
        })
    }

    /// Refuses new runs; running chains stop starting steps.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns whether [`ChainExecutor::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn events(&self) -> &EventBus<C> {
        self.dispatcher.events()
    }

    fn halted(&self, cancel: &CancellationToken) -> bool {
        cancel.is_cancelled() || self.shutdown.is_cancelled()
    }

    async fn run_step(
        &self,
        step: &ChainStep,
        input: &ChainInput,
        context: &ChainContext,
        payload: &EventPayload,
    ) -> ChainResult<InvocationResult> {
        let clock = self.dispatcher.clock();
        let mut request = InvocationRequest::new(
            step.ability().clone(),
            step.action(),
            input.caller_id(),
            clock,
        )?
        .with_metadata("chain_step", json!(step.id().as_str()));
        if let Some(conversation) = input.conversation_id() {
            request = request.with_conversation_id(conversation);
        }
        if let Some(timeout) = step.timeout() {
            request = request.with_timeout(timeout);
        }

        for (parameter, binding) in step.bindings() {
            request = match binding.resolve(context) {
                BindingResolution::Value(value) => request.with_parameter(parameter.clone(), value),
                BindingResolution::Absent => request.with_absent_parameter(parameter.clone()),
                BindingResolution::MissingField { step: source, path } => {
                    let message = format!(
                        "step '{source}' produced no field '{path}' for parameter '{parameter}'"
                    );
                    self.events().emit(
                        EventKind::InvocationFailed,
                        payload
                            .clone()
                            .with_request(request.id())
                            .with_ability(request.ability().clone())
                            .with_error_kind(ErrorKind::Validation)
                            .with_message(message.clone()),
                    );
                    return Ok(InvocationResult::failed(
                        &request,
                        InvocationError::new(ErrorKind::Validation, message),
                        Duration::ZERO,
                        clock,
                    ));
                }
            };
        }

        Ok(self.dispatcher.dispatch(&request, payload).await.result)
    }
}

fn not_run(step: &ChainStep, reason: &str) -> StepRecord {
    StepRecord {
        step: step.id().clone(),
        ability: step.ability().clone(),
        status: StepStatus::NotRun,
        result: None,
        reason: Some(reason.to_owned()),
    }
}
