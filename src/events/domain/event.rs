//! Event value objects.

use crate::ability::domain::{AbilityName, ErrorKind, Parameters, RequestId};
use crate::events::domain::ParseEventKindError;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Typed tag identifying what an [`Event`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// An invocation was dispatched to its ability.
    InvocationStarted,
    /// An invocation completed successfully.
    InvocationSucceeded,
    /// An invocation completed with a failure.
    InvocationFailed,
    /// A batch started executing.
    BatchStarted,
    /// A batch finished, with its terminal status.
    BatchCompleted,
    /// A rollback call was issued.
    RollbackTriggered,
    /// A rollback call completed.
    RollbackSucceeded,
    /// A rollback call failed or was unsupported.
    RollbackFailed,
    /// A chain run started.
    ChainStarted,
    /// A chain step was skipped because its predicate was false.
    ChainStepSkipped,
    /// A chain run reached a terminal status.
    ChainCompleted,
    /// A chain run was aborted by cancellation or shutdown.
    ChainAborted,
    /// An ability was registered.
    AbilityRegistered,
    /// An ability was deregistered.
    AbilityDeregistered,
    /// A registry singleton was constructed and initialised.
    AbilityInitialized,
    /// A registry singleton was shut down.
    AbilityShutdown,
    /// Plugin discovery could not register a candidate or enumerate.
    DiscoveryFailed,
    /// Diagnostic: a subscriber failed while handling an event.
    SubscriberFailed,
}

impl EventKind {
    /// Returns the canonical tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvocationStarted => "invocation-started",
            Self::InvocationSucceeded => "invocation-succeeded",
            Self::InvocationFailed => "invocation-failed",
            Self::BatchStarted => "batch-started",
            Self::BatchCompleted => "batch-completed",
            Self::RollbackTriggered => "rollback-triggered",
            Self::RollbackSucceeded => "rollback-succeeded",
            Self::RollbackFailed => "rollback-failed",
            Self::ChainStarted => "chain-started",
            Self::ChainStepSkipped => "chain-step-skipped",
            Self::ChainCompleted => "chain-completed",
            Self::ChainAborted => "chain-aborted",
            Self::AbilityRegistered => "ability-registered",
            Self::AbilityDeregistered => "ability-deregistered",
            Self::AbilityInitialized => "ability-initialized",
            Self::AbilityShutdown => "ability-shutdown",
            Self::DiscoveryFailed => "discovery-failed",
            Self::SubscriberFailed => "subscriber-failed",
        }
    }

    /// Returns whether this is a bus diagnostic rather than a domain event.
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::SubscriberFailed)
    }

    /// Returns whether the event reports something going wrong.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::InvocationFailed
                | Self::RollbackFailed
                | Self::ChainAborted
                | Self::DiscoveryFailed
        )
    }
}

const ALL_KINDS: [EventKind; 18] = [
    EventKind::InvocationStarted,
    EventKind::InvocationSucceeded,
    EventKind::InvocationFailed,
    EventKind::BatchStarted,
    EventKind::BatchCompleted,
    EventKind::RollbackTriggered,
    EventKind::RollbackSucceeded,
    EventKind::RollbackFailed,
    EventKind::ChainStarted,
    EventKind::ChainStepSkipped,
    EventKind::ChainCompleted,
    EventKind::ChainAborted,
    EventKind::AbilityRegistered,
    EventKind::AbilityDeregistered,
    EventKind::AbilityInitialized,
    EventKind::AbilityShutdown,
    EventKind::DiscoveryFailed,
    EventKind::SubscriberFailed,
];

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EventKind {
    type Error = ParseEventKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        ALL_KINDS
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or(ParseEventKindError(normalized))
    }
}

/// Identifiers and details carried by an [`Event`].
///
/// Every field is optional; publishers fill in what is relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Batch the event belongs to.
    pub batch_id: Option<Uuid>,
    /// Chain run the event belongs to.
    pub chain_id: Option<Uuid>,
    /// Invocation request the event concerns.
    pub request_id: Option<RequestId>,
    /// Ability the event concerns.
    pub ability: Option<AbilityName>,
    /// Chain step identifier.
    pub step: Option<String>,
    /// Error kind for failure events.
    pub error_kind: Option<ErrorKind>,
    /// Human-readable detail.
    pub message: Option<String>,
    /// Additional structured data.
    pub data: Parameters,
}

impl EventPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch identifier.
    #[must_use]
    pub const fn with_batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Sets the chain run identifier.
    #[must_use]
    pub const fn with_chain(mut self, chain_id: Uuid) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub const fn with_request(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets the ability name.
    #[must_use]
    pub fn with_ability(mut self, ability: AbilityName) -> Self {
        self.ability = Some(ability);
        self
    }

    /// Sets the chain step identifier.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Sets the error kind.
    #[must_use]
    pub const fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds one structured data field.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Something that happened, stamped with a time and identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    kind: EventKind,
    timestamp: DateTime<Utc>,
    payload: EventPayload,
}

impl Event {
    /// Creates an event stamped by `clock`.
    #[must_use]
    pub fn new(kind: EventKind, payload: EventPayload, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: clock.utc(),
            payload,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the event tag.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns when the event was created.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        &self.payload
    }
}
