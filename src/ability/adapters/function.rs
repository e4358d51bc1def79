//! Closure-backed ability for lightweight registrations and tests.

use crate::ability::{
    domain::{AbilityDescriptor, ActionOutcome, InvocationRequest},
    ports::{Ability, AbilityFault, RollbackError},
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type ActionFn =
    dyn Fn(InvocationRequest) -> BoxFuture<'static, Result<ActionOutcome, AbilityFault>> + Send + Sync;
type RollbackFn =
    dyn Fn(InvocationRequest) -> BoxFuture<'static, Result<(), RollbackError>> + Send + Sync;

/// Ability whose action logic is an async closure.
///
/// Lifecycle hooks are no-ops; rollback is supported only when a rollback
/// closure is attached with [`FunctionAbility::with_rollback`].
#[derive(Clone)]
pub struct FunctionAbility {
    descriptor: AbilityDescriptor,
    action: Arc<ActionFn>,
    rollback: Option<Arc<RollbackFn>>,
}

impl std::fmt::Debug for FunctionAbility {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FunctionAbility")
            .field("descriptor", &self.descriptor)
            .field("rollback", &self.rollback.is_some())
            .finish_non_exhaustive()
    }
}

impl FunctionAbility {
    /// Creates an ability from a descriptor and an action closure.
    #[must_use]
    pub fn new<F, Fut>(descriptor: AbilityDescriptor, action: F) -> Self
    where
        F: Fn(InvocationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ActionOutcome, AbilityFault>> + Send + 'static,
    {
        Self {
            descriptor,
            action: Arc::new(move |request| action(request).boxed()),
            rollback: None,
        }
    }

    /// Attaches a compensating closure and declares rollback support.
    #[must_use]
    pub fn with_rollback<F, Fut>(mut self, rollback: F) -> Self
    where
        F: Fn(InvocationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RollbackError>> + Send + 'static,
    {
        self.rollback = Some(Arc::new(move |request| rollback(request).boxed()));
        self
    }
}

#[async_trait]
impl Ability for FunctionAbility {
    fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    async fn execute_action(
        &self,
        request: &InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault> {
        (self.action)(request.clone()).await
    }

    fn supports_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    async fn rollback(&self, request: &InvocationRequest) -> Result<(), RollbackError> {
        match &self.rollback {
            Some(rollback) => rollback(request.clone()).await,
            None => Err(RollbackError::Unsupported(request.ability().clone())),
        }
    }
}
