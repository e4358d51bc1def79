//! Lifecycle-guarded ability instance and the execution template.

use crate::ability::{
    domain::{
        AbilityDescriptor, AbilityHealth, AbilityName, AbilityState, ActionOutcome, ErrorKind,
        HealthStatus, InvocationError, InvocationRequest, InvocationResult,
    },
    ports::{Ability, AbilityFault, RollbackError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Lifecycle errors raised by [`AbilityInstance`].
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The operation is not allowed in the current state.
    #[error("ability {ability} cannot {operation} while {state}")]
    InvalidState {
        /// Ability name.
        ability: AbilityName,
        /// Attempted operation.
        operation: &'static str,
        /// Current lifecycle state.
        state: AbilityState,
    },

    /// The ability's own lifecycle hook failed.
    #[error("ability {ability} failed to {operation}: {fault}")]
    Hook {
        /// Ability name.
        ability: AbilityName,
        /// Lifecycle operation whose hook failed.
        operation: &'static str,
        /// Fault raised by the hook.
        fault: AbilityFault,
    },
}

/// Reasons [`AbilityInstance::execute`] could not produce a result.
#[derive(Debug, Clone, Error)]
pub enum InvocationFailure {
    /// The instance is not initialised.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The action logic broke its contract.
    #[error("ability {ability} broke its contract: {fault}")]
    Fault {
        /// Ability name.
        ability: AbilityName,
        /// Contract violation raised by the ability.
        fault: AbilityFault,
    },
}

/// A constructed ability paired with its lifecycle state.
///
/// Registry singletons are handed out as `Arc<AbilityInstance>`.
pub struct AbilityInstance {
    ability: Arc<dyn Ability>,
    state: Mutex<AbilityState>,
}

impl std::fmt::Debug for AbilityInstance {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AbilityInstance")
            .field("ability", self.name())
            .finish_non_exhaustive()
    }
}

impl AbilityInstance {
    /// Wraps an uninitialised ability.
    #[must_use]
    pub fn new(ability: Arc<dyn Ability>) -> Self {
        Self {
            ability,
            state: Mutex::new(AbilityState::Uninitialized),
        }
    }

    /// Returns the ability descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &AbilityDescriptor {
        self.ability.descriptor()
    }

    /// Returns the ability name.
    #[must_use]
    pub fn name(&self) -> &AbilityName {
        self.ability.descriptor().name()
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> AbilityState {
        *self.state.lock().await
    }

    /// Initialises the ability; a no-op when already initialised.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidState`] after shutdown and
    /// [`LifecycleError::Hook`] when the ability's hook fails.
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        match *state {
            AbilityState::Initialized => {
                tracing::debug!(ability = %self.name(), "ability already initialised");
                Ok(())
            }
            AbilityState::Shutdown => Err(LifecycleError::InvalidState {
                ability: self.name().clone(),
                operation: "initialize",
                state: *state,
            }),
            AbilityState::Uninitialized => {
                self.ability
                    .initialize()
                    .await
                    .map_err(|fault| LifecycleError::Hook {
                        ability: self.name().clone(),
                        operation: "initialize",
                        fault,
                    })?;
                *state = AbilityState::Initialized;
                Ok(())
            }
        }
    }

    /// Shuts the ability down; a no-op when already shut down.
    ///
    /// The instance is marked shut down even when the hook fails.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Hook`] when the ability's hook fails.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        let previous = *state;
        *state = AbilityState::Shutdown;
        if previous != AbilityState::Initialized {
            return Ok(());
        }

        self.ability
            .shutdown()
            .await
            .map_err(|fault| LifecycleError::Hook {
                ability: self.name().clone(),
                operation: "shutdown",
                fault,
            })
    }

    /// Runs the fast pre-filter.
    #[must_use]
    pub fn can_handle(&self, request: &InvocationRequest) -> bool {
        self.ability.can_handle(request)
    }

    /// Returns whether the ability can undo its work.
    #[must_use]
    pub fn supports_rollback(&self) -> bool {
        self.ability.supports_rollback()
    }

    /// Runs the execution template: lifecycle check, validation, action.
    ///
    /// Validation failures and domain failures become failed results.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationFailure::Lifecycle`] when the instance is not
    /// initialised and [`InvocationFailure::Fault`] on contract violations.
    pub async fn execute(
        &self,
        request: &InvocationRequest,
        clock: &impl Clock,
    ) -> Result<InvocationResult, InvocationFailure> {
        let started = Instant::now();
        let state = self.state().await;
        if !state.can_execute() {
            return Err(LifecycleError::InvalidState {
                ability: self.name().clone(),
                operation: "execute",
                state,
            }
            .into());
        }

        if let Err(violation) = self.ability.validate(request) {
            tracing::debug!(
                ability = %self.name(),
                request_id = %request.id(),
                %violation,
                "request rejected by validation"
            );
            let error = InvocationError::new(ErrorKind::Validation, violation.to_string());
            return Ok(InvocationResult::failed(
                request,
                error,
                started.elapsed(),
                clock,
            ));
        }

        let outcome =
            self.ability
                .execute_action(request)
                .await
                .map_err(|fault| InvocationFailure::Fault {
                    ability: self.name().clone(),
                    fault,
                })?;

        let result = match outcome {
            ActionOutcome::Succeeded { data, message } => {
                let result = InvocationResult::succeeded(request, data, started.elapsed(), clock);
                match message {
                    Some(text) => result.with_message(text),
                    None => result,
                }
            }
            ActionOutcome::Failed { reason, details } => {
                let error = InvocationError::new(ErrorKind::Ability, reason).with_details(details);
                InvocationResult::failed(request, error, started.elapsed(), clock)
            }
        };
        Ok(result)
    }

    /// Undoes a previous successful invocation.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::Unsupported`] without calling the ability when
    /// it does not declare rollback support.
    pub async fn rollback(&self, request: &InvocationRequest) -> Result<(), RollbackError> {
        if !self.supports_rollback() {
            return Err(RollbackError::Unsupported(self.name().clone()));
        }
        self.ability.rollback(request).await
    }

    /// Reports current health.
    pub async fn health(&self, clock: &impl Clock) -> AbilityHealth {
        let descriptor = self.descriptor();
        let state = self.state().await;
        let checked_at = clock.utc();
        if !state.can_execute() {
            return AbilityHealth::new(
                descriptor.name().clone(),
                descriptor.version(),
                HealthStatus::NotInitialized,
                checked_at,
            )
            .with_message(format!("ability is {state}"));
        }

        match self.ability.check_health().await {
            Ok(()) => AbilityHealth::new(
                descriptor.name().clone(),
                descriptor.version(),
                HealthStatus::Healthy,
                checked_at,
            ),
            Err(fault) => AbilityHealth::new(
                descriptor.name().clone(),
                descriptor.version(),
                HealthStatus::Unhealthy,
                checked_at,
            )
            .with_message(fault.to_string()),
        }
    }
}
