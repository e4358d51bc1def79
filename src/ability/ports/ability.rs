//! The ability contract implemented by every pluggable unit of work.

use crate::ability::domain::{
    AbilityDescriptor, AbilityName, ActionOutcome, InvocationRequest, RequestViolation,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Fixed-shape contract for a pluggable unit of work.
///
/// The executor owns the template (lifecycle check, validate, execute,
/// optional rollback); implementations only supply the pieces. Domain
/// failures are reported as [`ActionOutcome::Failed`]; an `Err` from
/// [`Ability::execute_action`] is a contract violation and is recorded as an
/// internal error by the executor.
#[async_trait]
pub trait Ability: Send + Sync {
    /// Returns the descriptor this ability was registered with.
    fn descriptor(&self) -> &AbilityDescriptor;

    /// Cheap pre-filter used to select candidate abilities.
    ///
    /// Must be side-effect free and must not block.
    fn can_handle(&self, request: &InvocationRequest) -> bool {
        let descriptor = self.descriptor();
        request.ability() == descriptor.name() && descriptor.supports_action(request.action())
    }

    /// Validates a request before any action logic runs.
    ///
    /// The default checks the request against the declared descriptor.
    ///
    /// # Errors
    ///
    /// Returns the [`RequestViolation`] that makes the request invalid.
    fn validate(&self, request: &InvocationRequest) -> Result<(), RequestViolation> {
        self.descriptor().validate_request(request)
    }

    /// Acquires resources before the first execution.
    async fn initialize(&self) -> Result<(), AbilityFault> {
        Ok(())
    }

    /// Releases resources.
    async fn shutdown(&self) -> Result<(), AbilityFault> {
        Ok(())
    }

    /// Runs the ability-specific action logic for a validated request.
    async fn execute_action(
        &self,
        request: &InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault>;

    /// Returns whether [`Ability::rollback`] can undo a successful invocation.
    fn supports_rollback(&self) -> bool {
        false
    }

    /// Undoes the effect of a previously successful invocation of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::Unsupported`] unless overridden.
    async fn rollback(&self, request: &InvocationRequest) -> Result<(), RollbackError> {
        Err(RollbackError::Unsupported(request.ability().clone()))
    }

    /// Reports whether the ability can currently serve requests.
    async fn check_health(&self) -> Result<(), AbilityFault> {
        Ok(())
    }
}

/// Contract violation raised by ability code.
#[derive(Debug, Clone, Error)]
pub enum AbilityFault {
    /// The ability broke an invariant of the contract.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// An unexpected error escaped the ability.
    #[error("ability runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl AbilityFault {
    /// Creates a contract violation with the given description.
    #[must_use]
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Wraps an unexpected runtime error.
    #[must_use]
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}

/// Errors returned by [`Ability::rollback`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RollbackError {
    /// The ability cannot undo its work.
    #[error("ability {0} does not support rollback")]
    Unsupported(AbilityName),

    /// The compensating action failed.
    #[error("rollback failed: {0}")]
    Failed(String),
}
