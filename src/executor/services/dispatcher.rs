//! Single-invocation pipeline shared by the action and chain executors.

use crate::ability::{
    domain::{
        AbilityName, ErrorKind, InvocationError, InvocationRequest, InvocationResult, RequestId,
    },
    ports::RollbackError,
    services::{AbilityInstance, InvocationFailure},
};
use crate::config::ExecutorConfig;
use crate::events::{
    domain::{EventKind, EventPayload},
    services::EventBus,
};
use crate::executor::domain::{RollbackRecord, RollbackStatus};
use crate::registry::services::{CapabilityRegistry, RegistryError};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;

type InFlightKey = (AbilityName, RequestId);

/// Result of dispatching one request.
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// The invocation result.
    pub result: InvocationResult,
    /// The instance that ran the request, when one was resolved.
    pub instance: Option<Arc<AbilityInstance>>,
}

/// Resolves, runs and reports individual invocations.
///
/// Each invocation runs on its own task so that a panicking ability cannot
/// take the caller down, and is abandoned (aborted) when it exceeds its
/// timeout. The same (ability, request id) pair is never run twice
/// concurrently, even while an abandoned task is still winding down.
pub struct InvocationDispatcher<C>
where
    C: Clock + Send + Sync + 'static,
{
    registry: Arc<CapabilityRegistry<C>>,
    events: Arc<EventBus<C>>,
    config: ExecutorConfig,
    clock: Arc<C>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl<C> std::fmt::Debug for InvocationDispatcher<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> InvocationDispatcher<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        registry: Arc<CapabilityRegistry<C>>,
        events: Arc<EventBus<C>>,
        config: ExecutorConfig,
        clock: Arc<C>,
    ) -> Self {
        Self {
            registry,
            events,
            config,
            clock,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns the executor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the registry used for resolution.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CapabilityRegistry<C>> {
        &self.registry
    }

    /// Returns the bus events are published on.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventBus<C>> {
        &self.events
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs one request to a result.
    ///
    /// Never fails: every problem is captured in the returned result.
    /// `context` carries batch or chain identifiers into published events.
    pub async fn dispatch(
        &self,
        request: &InvocationRequest,
        context: &EventPayload,
    ) -> Dispatched {
        let started = Instant::now();
        let payload = context
            .clone()
            .with_request(request.id())
            .with_ability(request.ability().clone());
        self.events.emit(EventKind::InvocationStarted, payload.clone());

        let dispatched = match self.claim(request) {
            Some(claim) => self.run(request, claim, started).await,
            None => Dispatched {
                result: self.failure(
                    request,
                    ErrorKind::DuplicateInvocation,
                    format!("request {} is already running", request.id()),
                    started,
                ),
                instance: None,
            },
        };

        self.report(&dispatched.result, payload);
        dispatched
    }

    /// Asks `instance` to undo `request`.
    ///
    /// Never fails: the outcome is captured in the returned record and
    /// published as events.
    pub async fn rollback(
        &self,
        instance: &Arc<AbilityInstance>,
        request: &InvocationRequest,
        context: &EventPayload,
    ) -> RollbackRecord {
        let payload = context
            .clone()
            .with_request(request.id())
            .with_ability(request.ability().clone());
        self.events.emit(EventKind::RollbackTriggered, payload.clone());

        let (status, message) = if instance.supports_rollback() {
            self.run_rollback(instance, request).await
        } else {
            (
                RollbackStatus::Unsupported,
                Some(RollbackError::Unsupported(request.ability().clone()).to_string()),
            )
        };

        match status {
            RollbackStatus::RolledBack => {
                self.events.emit(EventKind::RollbackSucceeded, payload);
            }
            RollbackStatus::Unsupported | RollbackStatus::Failed => {
                let kind = if status == RollbackStatus::Unsupported {
                    ErrorKind::RollbackUnsupported
                } else {
                    ErrorKind::RollbackFailed
                };
                let failed = payload
                    .with_error_kind(kind)
                    .with_message(message.clone().unwrap_or_default());
                self.events.emit(EventKind::RollbackFailed, failed);
            }
        }

        RollbackRecord {
            request_id: request.id(),
            ability: request.ability().clone(),
            status,
            message,
        }
    }

    async fn run(
        &self,
        request: &InvocationRequest,
        claim: InFlightClaim,
        started: Instant,
    ) -> Dispatched {
        let instance = match self.registry.get_instance(request.ability()).await {
            Ok(instance) => instance,
            Err(err) => {
                let kind = registry_error_kind(&err);
                return Dispatched {
                    result: self.failure(request, kind, err.to_string(), started),
                    instance: None,
                };
            }
        };

        let mut task = tokio::spawn({
            let instance = Arc::clone(&instance);
            let request = request.clone();
            let clock = Arc::clone(&self.clock);
            async move {
                let _claim = claim;
                instance.execute(&request, clock.as_ref()).await
            }
        });

        let timeout = request.timeout().or_else(|| self.config.default_timeout());
        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    tracing::debug!(
                        ability = %request.ability(),
                        request_id = %request.id(),
                        "invocation abandoned after timeout"
                    );
                    return Dispatched {
                        result: self.failure(
                            request,
                            ErrorKind::Timeout,
                            format!("invocation exceeded {}", format_duration(limit)),
                            started,
                        ),
                        instance: Some(instance),
                    };
                }
            },
            None => task.await,
        };

        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(InvocationFailure::Lifecycle(err))) => {
                self.failure(request, ErrorKind::Lifecycle, err.to_string(), started)
            }
            Ok(Err(fault @ InvocationFailure::Fault { .. })) => {
                self.failure(request, ErrorKind::Internal, fault.to_string(), started)
            }
            Err(join) => self.failure(request, ErrorKind::Internal, join_message(&join), started),
        };
        Dispatched {
            result,
            instance: Some(instance),
        }
    }

    async fn run_rollback(
        &self,
        instance: &Arc<AbilityInstance>,
        request: &InvocationRequest,
    ) -> (RollbackStatus, Option<String>) {
        let mut task = tokio::spawn({
            let instance = Arc::clone(instance);
            let request = request.clone();
            async move { instance.rollback(&request).await }
        });

        let joined = match self.config.rollback_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return (
                        RollbackStatus::Failed,
                        Some(format!("rollback exceeded {}", format_duration(limit))),
                    );
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(())) => (RollbackStatus::RolledBack, None),
            Ok(Err(err @ RollbackError::Unsupported(_))) => {
                (RollbackStatus::Unsupported, Some(err.to_string()))
            }
            Ok(Err(err @ RollbackError::Failed(_))) => {
                (RollbackStatus::Failed, Some(err.to_string()))
            }
            Err(join) => (RollbackStatus::Failed, Some(join_message(&join))),
        }
    }

    fn claim(&self, request: &InvocationRequest) -> Option<InFlightClaim> {
        let key = (request.ability().clone(), request.id());
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        if !inserted {
            return None;
        }
        Some(InFlightClaim {
            registry: Arc::clone(&self.in_flight),
            key,
        })
    }

    fn failure(
        &self,
        request: &InvocationRequest,
        kind: ErrorKind,
        message: String,
        started: Instant,
    ) -> InvocationResult {
        InvocationResult::failed(
            request,
            InvocationError::new(kind, message),
            started.elapsed(),
            self.clock.as_ref(),
        )
    }

    fn report(&self, result: &InvocationResult, payload: EventPayload) {
        match result.error() {
            None => self.events.emit(EventKind::InvocationSucceeded, payload),
            Some(error) => {
                let failed = payload
                    .with_error_kind(error.kind())
                    .with_message(error.message());
                self.events.emit(EventKind::InvocationFailed, failed);
            }
        }
    }
}

/// Holds an (ability, request id) slot until dropped.
///
/// The claim moves into the spawned invocation task, so an abandoned
/// invocation keeps its slot until the task actually ends.
struct InFlightClaim {
    registry: Arc<Mutex<HashSet<InFlightKey>>>,
    key: InFlightKey,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

const fn registry_error_kind(err: &RegistryError) -> ErrorKind {
    match err {
        RegistryError::NotFound(_) => ErrorKind::NotFound,
        RegistryError::Instantiation { .. } => ErrorKind::Instantiation,
        RegistryError::EntryShutdown(_) | RegistryError::Lifecycle(_) => ErrorKind::Lifecycle,
        RegistryError::DuplicateName(_)
        | RegistryError::InvalidImplementation(_)
        | RegistryError::Lock(_) => ErrorKind::Internal,
    }
}

fn join_message(err: &JoinError) -> String {
    if err.is_panic() {
        "ability panicked during execution".to_owned()
    } else {
        format!("ability task did not complete: {err}")
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
