//! Shared fixtures for registry tests.

use crate::ability::{
    adapters::FunctionAbility,
    domain::{AbilityDescriptor, AbilityName, ActionOutcome},
    ports::{Ability, AbilityFault},
};
use crate::registry::ports::AbilityFactory;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub(super) fn name(value: &str) -> AbilityName {
    AbilityName::new(value).expect("valid ability name")
}

pub(super) fn descriptor(ability: &str) -> AbilityDescriptor {
    AbilityDescriptor::new(name(ability), "1.0.0").with_action("run")
}

pub(super) fn function_ability(ability: &str) -> Arc<dyn Ability> {
    Arc::new(FunctionAbility::new(descriptor(ability), |_request| async {
        Ok(ActionOutcome::success(serde_json::Map::new()))
    }))
}

/// Ability whose initialisation yields so that concurrent callers overlap.
pub(super) struct SlowInit {
    descriptor: AbilityDescriptor,
}

#[async_trait]
impl Ability for SlowInit {
    fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    async fn initialize(&self) -> Result<(), AbilityFault> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }

    async fn execute_action(
        &self,
        _request: &crate::ability::domain::InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault> {
        Ok(ActionOutcome::success(serde_json::Map::new()))
    }
}

/// Factory that counts constructions.
pub(super) fn counting_factory(
    ability: &str,
) -> (Arc<AtomicUsize>, Arc<dyn AbilityFactory>) {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();
    let built = descriptor(ability);
    let factory = move || -> Result<Arc<dyn Ability>, AbilityFault> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(SlowInit {
            descriptor: built.clone(),
        }))
    };
    (constructed, Arc::new(factory))
}

/// Ability whose initialisation waits for `gate`, counting lifecycle hooks.
pub(super) struct GatedInit {
    descriptor: AbilityDescriptor,
    gate: Arc<Notify>,
    started: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl Ability for GatedInit {
    fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    async fn initialize(&self) -> Result<(), AbilityFault> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), AbilityFault> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute_action(
        &self,
        _request: &crate::ability::domain::InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault> {
        Ok(ActionOutcome::success(serde_json::Map::new()))
    }
}

/// Handles for driving a [`GatedInit`] from a test.
pub(super) struct Gate {
    pub(super) open: Arc<Notify>,
    pub(super) started: Arc<AtomicUsize>,
    pub(super) shutdowns: Arc<AtomicUsize>,
}

/// Factory for a [`GatedInit`] ability.
pub(super) fn gated_factory(ability: &str) -> (Gate, Arc<dyn AbilityFactory>) {
    let gate = Gate {
        open: Arc::new(Notify::new()),
        started: Arc::new(AtomicUsize::new(0)),
        shutdowns: Arc::new(AtomicUsize::new(0)),
    };
    let built = descriptor(ability);
    let (open, started, shutdowns) = (
        Arc::clone(&gate.open),
        Arc::clone(&gate.started),
        Arc::clone(&gate.shutdowns),
    );
    let factory = move || -> Result<Arc<dyn Ability>, AbilityFault> {
        Ok(Arc::new(GatedInit {
            descriptor: built.clone(),
            gate: Arc::clone(&open),
            started: Arc::clone(&started),
            shutdowns: Arc::clone(&shutdowns),
        }))
    };
    (gate, Arc::new(factory))
}

/// Ability that claims every request once it is live.
pub(super) struct CatchAll {
    descriptor: AbilityDescriptor,
}

impl CatchAll {
    pub(super) fn new(ability: &str) -> Self {
        Self {
            descriptor: descriptor(ability),
        }
    }
}

#[async_trait]
impl Ability for CatchAll {
    fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, _request: &crate::ability::domain::InvocationRequest) -> bool {
        true
    }

    async fn execute_action(
        &self,
        _request: &crate::ability::domain::InvocationRequest,
    ) -> Result<ActionOutcome, AbilityFault> {
        Ok(ActionOutcome::success(serde_json::Map::new()))
    }
}
