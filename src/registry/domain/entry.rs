//! Registry entry states and listing snapshots.

use crate::ability::domain::{AbilityDescriptor, AbilityName, Parameters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle of a registry entry.
///
/// An unregistered name simply has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Registered; no live instance.
    Registered,
    /// A singleton instance is constructed and initialised.
    Initialized,
    /// The singleton was shut down; a reset is needed to serve again.
    Shutdown,
}

impl EntryState {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Initialized => "initialized",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to parse an entry state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown registry entry state: {0}")]
pub struct ParseEntryStateError(pub String);

impl TryFrom<&str> for EntryState {
    type Error = ParseEntryStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "registered" => Ok(Self::Registered),
            "initialized" => Ok(Self::Initialized),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(ParseEntryStateError(other.to_owned())),
        }
    }
}

/// Point-in-time view of one registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredAbility {
    descriptor: AbilityDescriptor,
    state: EntryState,
    metadata: Parameters,
    registered_at: DateTime<Utc>,
}

impl RegisteredAbility {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(
        descriptor: AbilityDescriptor,
        state: EntryState,
        metadata: Parameters,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            descriptor,
            state,
            metadata,
            registered_at,
        }
    }

    /// Returns the ability name.
    #[must_use]
    pub const fn name(&self) -> &AbilityName {
        self.descriptor.name()
    }

    /// Returns the registered descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &AbilityDescriptor {
        &self.descriptor
    }

    /// Returns the entry state at snapshot time.
    #[must_use]
    pub const fn state(&self) -> EntryState {
        self.state
    }

    /// Returns the registration metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Parameters {
        &self.metadata
    }

    /// Returns when the entry was registered.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}
