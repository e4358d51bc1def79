//! Renders bus events as `tracing` records.

use crate::events::{
    domain::{Event, EventKind},
    services::{EventBus, EventBusResult, SubscriptionId},
};
use mockable::Clock;

/// Severity chosen for an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    /// Routine progress.
    Debug,
    /// Notable state changes.
    Info,
    /// Failures reported by components.
    Warn,
    /// Bus diagnostics.
    Error,
}

impl SinkLevel {
    /// Returns the level used for `kind`.
    #[must_use]
    pub const fn for_kind(kind: EventKind) -> Self {
        if kind.is_diagnostic() {
            return Self::Error;
        }
        if kind.is_failure() {
            return Self::Warn;
        }
        match kind {
            EventKind::InvocationStarted
            | EventKind::InvocationSucceeded
            | EventKind::RollbackTriggered
            | EventKind::ChainStepSkipped => Self::Debug,
            _ => Self::Info,
        }
    }
}

/// Observability sink that logs every event it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// Subscribes the sink to every event on `bus`.
    ///
    /// # Errors
    ///
    /// Propagates subscription failures from the bus.
    pub fn attach<C>(bus: &EventBus<C>) -> EventBusResult<SubscriptionId>
    where
        C: Clock + Send + Sync,
    {
        bus.subscribe_all(|event| {
            Self::record(event);
            Ok(())
        })
    }

    /// Emits one `tracing` record for `event`.
    pub fn record(event: &Event) {
        let payload = event.payload();
        let kind = event.kind().as_str();
        let ability = payload.ability.as_ref().map(ToString::to_string);
        let request_id = payload.request_id.map(|id| id.to_string());
        let error_kind = payload.error_kind.map(|error| error.as_str());
        let message = payload.message.as_deref().unwrap_or("");

        match SinkLevel::for_kind(event.kind()) {
            SinkLevel::Debug => tracing::debug!(
                kind,
                ability = ability.as_deref(),
                request_id = request_id.as_deref(),
                step = payload.step.as_deref(),
                "{message}"
            ),
            SinkLevel::Info => tracing::info!(
                kind,
                ability = ability.as_deref(),
                request_id = request_id.as_deref(),
                step = payload.step.as_deref(),
                "{message}"
            ),
            SinkLevel::Warn => tracing::warn!(
                kind,
                ability = ability.as_deref(),
                request_id = request_id.as_deref(),
                error_kind,
                step = payload.step.as_deref(),
                "{message}"
            ),
            SinkLevel::Error => tracing::error!(kind, "{message}"),
        }
    }
}
