//! Ability instance lifecycle state.

use super::ParseAbilityStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a constructed ability instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityState {
    /// Constructed but not yet initialised.
    Uninitialized,
    /// Ready to execute requests.
    Initialized,
    /// Shut down; execution is refused.
    Shutdown,
}

impl AbilityState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Shutdown => "shutdown",
        }
    }

    /// Returns whether requests may be executed in this state.
    #[must_use]
    pub const fn can_execute(self) -> bool {
        matches!(self, Self::Initialized)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// Self-transitions are allowed so that initialise and shutdown stay
    /// idempotent.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Uninitialized, _)
                | (Self::Initialized, Self::Initialized | Self::Shutdown)
                | (Self::Shutdown, Self::Shutdown)
        )
    }
}

impl fmt::Display for AbilityState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AbilityState {
    type Error = ParseAbilityStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "uninitialized" => Ok(Self::Uninitialized),
            "initialized" => Ok(Self::Initialized),
            "shutdown" => Ok(Self::Shutdown),
            _ => Err(ParseAbilityStateError(value.to_owned())),
        }
    }
}
