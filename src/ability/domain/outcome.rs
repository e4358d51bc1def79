//! Outcome returned by ability-specific action logic.

use super::Parameters;
use serde_json::Value;

/// What an ability's action logic reports back.
///
/// Domain failures are values, not errors: action logic catches its own
/// failures and returns [`ActionOutcome::Failed`]. Only contract violations
/// are returned as [`crate::ability::ports::AbilityFault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action completed.
    Succeeded {
        /// Structured result data.
        data: Parameters,
        /// Optional human-readable message.
        message: Option<String>,
    },
    /// The action ran and failed for a domain reason.
    Failed {
        /// Failure description.
        reason: String,
        /// Structured failure details.
        details: Parameters,
    },
}

impl ActionOutcome {
    /// Creates a successful outcome with the given data.
    #[must_use]
    pub const fn success(data: Parameters) -> Self {
        Self::Succeeded {
            data,
            message: None,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            details: Parameters::new(),
        }
    }

    /// Adds a field to the success data; ignored on failures.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Self::Succeeded { data, .. } = &mut self {
            data.insert(key.into(), value);
        }
        self
    }

    /// Sets the success message; ignored on failures.
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        if let Self::Succeeded { message, .. } = &mut self {
            *message = Some(text.into());
        }
        self
    }

    /// Adds a structured detail to a failure; ignored on successes.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Self::Failed { details, .. } = &mut self {
            details.insert(key.into(), value);
        }
        self
    }

    /// Returns whether the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}
