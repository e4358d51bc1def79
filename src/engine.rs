//! Engine facade bundling the registry, event bus and executors.

use crate::ability::domain::{InvocationRequest, InvocationResult};
use crate::chain::{
    domain::{ChainDefinition, ChainInput, ChainRun},
    services::{ChainExecutor, ChainResult},
};
use crate::config::{ConfigError, EngineConfig};
use crate::events::{
    adapters::TracingEventSink,
    services::{EventBus, EventBusError, SubscriptionId},
};
use crate::executor::{
    domain::{BatchOutcome, ExecutionBatch},
    services::{ActionExecutor, ExecutorResult, InvocationDispatcher},
};
use crate::registry::{
    domain::DiscoveryReport,
    ports::PluginLocator,
    services::{CapabilityRegistry, RegisterAbilityRequest, RegistryError, RegistryResult},
};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors raised while assembling an engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The logging sink could not subscribe to the event bus.
    #[error(transparent)]
    Events(#[from] EventBusError),
}

/// Result type for engine construction.
pub type EngineResult<T> = Result<T, EngineError>;

/// One registry, one event bus and the two executors, wired together.
///
/// This is the surface a CLI, HTTP or voice front-end drives: it accepts
/// requests, batches and chain definitions and returns results and
/// statuses. Both executors share a single dispatcher, so a request id is
/// never run twice concurrently across batches and chains.
pub struct AbilityEngine<C = DefaultClock>
where
    C: Clock + Send + Sync + 'static,
{
    config: EngineConfig,
    events: Arc<EventBus<C>>,
    registry: Arc<CapabilityRegistry<C>>,
    actions: ActionExecutor<C>,
    chains: ChainExecutor<C>,
    sink: SubscriptionId,
}

impl<C> std::fmt::Debug for AbilityEngine<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilityEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("actions", &self.actions)
            .field("chains", &self.chains)
            .finish_non_exhaustive()
    }
}

impl AbilityEngine<DefaultClock> {
    /// Builds an engine on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` fails validation.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_clock(config, Arc::new(DefaultClock))
    }

    /// Builds an engine from a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the document does not parse or
    /// validate.
    pub fn from_json_str(document: &str) -> EngineResult<Self> {
        Self::new(EngineConfig::from_json_str(document)?)
    }
}

impl<C> AbilityEngine<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Builds an engine around an injected clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` fails validation.
    pub fn with_clock(config: EngineConfig, clock: Arc<C>) -> EngineResult<Self> {
        config.validate()?;

        let events = Arc::new(EventBus::new(&config.events, Arc::clone(&clock)));
        let sink = TracingEventSink::attach(&events)?;
        let registry = Arc::new(
            CapabilityRegistry::new(Arc::clone(&clock)).with_event_bus(Arc::clone(&events)),
        );
        let dispatcher = Arc::new(InvocationDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&events),
            config.executor.clone(),
            clock,
        ));

        tracing::debug!(
            max_in_flight = config.executor.max_in_flight,
            history_capacity = config.events.history_capacity,
            "ability engine assembled"
        );
        Ok(Self {
            actions: ActionExecutor::with_dispatcher(Arc::clone(&dispatcher)),
            chains: ChainExecutor::with_dispatcher(dispatcher),
            config,
            events,
            registry,
            sink,
        })
    }

    /// Returns the configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the event bus.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventBus<C>> {
        &self.events
    }

    /// Returns the capability registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CapabilityRegistry<C>> {
        &self.registry
    }

    /// Returns the action executor.
    #[must_use]
    pub const fn actions(&self) -> &ActionExecutor<C> {
        &self.actions
    }

    /// Returns the chain executor.
    #[must_use]
    pub const fn chains(&self) -> &ChainExecutor<C> {
        &self.chains
    }

    /// Returns the subscription of the built-in logging sink.
    #[must_use]
    pub const fn sink_subscription(&self) -> SubscriptionId {
        self.sink
    }

    /// Registers an ability.
    ///
    /// # Errors
    ///
    /// See [`CapabilityRegistry::register`].
    pub async fn register(&self, request: RegisterAbilityRequest) -> RegistryResult<()> {
        self.registry.register(request).await
    }

    /// Registers every valid candidate produced by `locator`.
    pub async fn discover(&self, locator: &dyn PluginLocator) -> DiscoveryReport {
        self.registry.discover(locator).await
    }

    /// Runs a single request.
    ///
    /// # Errors
    ///
    /// Fails only after [`AbilityEngine::shutdown`].
    pub async fn invoke(&self, request: &InvocationRequest) -> ExecutorResult<InvocationResult> {
        self.actions.invoke(request).await
    }

    /// Runs a batch.
    ///
    /// # Errors
    ///
    /// Fails only after [`AbilityEngine::shutdown`].
    pub async fn run_batch(&self, batch: &ExecutionBatch) -> ExecutorResult<BatchOutcome> {
        self.actions.run(batch).await
    }

    /// Runs a batch under an external cancellation signal.
    ///
    /// # Errors
    ///
    /// Fails only after [`AbilityEngine::shutdown`].
    pub async fn run_batch_with_cancellation(
        &self,
        batch: &ExecutionBatch,
        cancel: &CancellationToken,
    ) -> ExecutorResult<BatchOutcome> {
        self.actions.run_with_cancellation(batch, cancel).await
    }

    /// Runs a chain.
    ///
    /// # Errors
    ///
    /// Fails after [`AbilityEngine::shutdown`] or when a step request
    /// cannot be built from `input`.
    pub async fn run_chain(
        &self,
        chain: &ChainDefinition,
        input: &ChainInput,
    ) -> ChainResult<ChainRun> {
        self.chains.run(chain, input).await
    }

    /// Runs a chain under an external cancellation signal.
    ///
    /// # Errors
    ///
    /// Fails after [`AbilityEngine::shutdown`] or when a step request
    /// cannot be built from `input`.
    pub async fn run_chain_with_cancellation(
        &self,
        chain: &ChainDefinition,
        input: &ChainInput,
        cancel: &CancellationToken,
    ) -> ChainResult<ChainRun> {
        self.chains.run_with_cancellation(chain, input, cancel).await
    }

    /// Stops both executors, shuts down every live ability and closes the
    /// bus.
    ///
    /// Runs already in progress stop starting new invocations. Returns the
    /// failures reported by ability shutdown hooks.
    pub async fn shutdown(&self) -> Vec<RegistryError> {
        self.actions.shutdown();
        self.chains.shutdown();
        let failures = self.registry.shutdown_all().await;
        for failure in &failures {
            tracing::warn!(error = %failure, "ability shutdown failed");
        }
        self.events.close();
        failures
    }
}
