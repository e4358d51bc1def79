//! Invocation results and the per-invocation error taxonomy.

use super::{AbilityName, InvocationRequest, Parameters, ParseErrorKindError, RequestId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Distinguished kind of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No ability is registered under the requested name.
    NotFound,
    /// The ability was not in a state that allows execution.
    Lifecycle,
    /// The request failed the ability's own validation.
    Validation,
    /// The ability ran and reported a domain failure.
    Ability,
    /// The ability broke its contract (returned a fault or panicked).
    Internal,
    /// The invocation exceeded its timeout.
    Timeout,
    /// The ability could not be constructed.
    Instantiation,
    /// The same request was already running.
    DuplicateInvocation,
    /// Rollback was required but the ability cannot undo its work.
    RollbackUnsupported,
    /// Rollback was attempted and failed.
    RollbackFailed,
}

impl ErrorKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Lifecycle => "lifecycle",
            Self::Validation => "validation",
            Self::Ability => "ability",
            Self::Internal => "internal",
            Self::Timeout => "timeout",
            Self::Instantiation => "instantiation",
            Self::DuplicateInvocation => "duplicate_invocation",
            Self::RollbackUnsupported => "rollback_unsupported",
            Self::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ErrorKind {
    type Error = ParseErrorKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "not_found" => Ok(Self::NotFound),
            "lifecycle" => Ok(Self::Lifecycle),
            "validation" => Ok(Self::Validation),
            "ability" => Ok(Self::Ability),
            "internal" => Ok(Self::Internal),
            "timeout" => Ok(Self::Timeout),
            "instantiation" => Ok(Self::Instantiation),
            "duplicate_invocation" => Ok(Self::DuplicateInvocation),
            "rollback_unsupported" => Ok(Self::RollbackUnsupported),
            "rollback_failed" => Ok(Self::RollbackFailed),
            _ => Err(ParseErrorKindError(value.to_owned())),
        }
    }
}

/// Structured description of a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationError {
    kind: ErrorKind,
    message: String,
    details: Parameters,
}

impl InvocationError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Parameters::new(),
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Parameters) -> Self {
        self.details = details;
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns structured details.
    #[must_use]
    pub const fn details(&self) -> &Parameters {
        &self.details
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of exactly one invocation attempt.
///
/// Results are immutable; a retry produces a new result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    request_id: RequestId,
    ability: AbilityName,
    action: String,
    success: bool,
    message: Option<String>,
    data: Parameters,
    error: Option<InvocationError>,
    duration: Duration,
    completed_at: DateTime<Utc>,
}

impl InvocationResult {
    /// Creates a successful result for `request`.
    #[must_use]
    pub fn succeeded(
        request: &InvocationRequest,
        data: Parameters,
        duration: Duration,
        clock: &impl Clock,
    ) -> Self {
        Self {
            request_id: request.id(),
            ability: request.ability().clone(),
            action: request.action().to_owned(),
            success: true,
            message: None,
            data,
            error: None,
            duration,
            completed_at: clock.utc(),
        }
    }

    /// Creates a failed result for `request`.
    #[must_use]
    pub fn failed(
        request: &InvocationRequest,
        error: InvocationError,
        duration: Duration,
        clock: &impl Clock,
    ) -> Self {
        Self {
            request_id: request.id(),
            ability: request.ability().clone(),
            action: request.action().to_owned(),
            success: false,
            message: None,
            data: Parameters::new(),
            error: Some(error),
            duration,
            completed_at: clock.utc(),
        }
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the identifier of the request this result answers.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the ability name.
    #[must_use]
    pub const fn ability(&self) -> &AbilityName {
        &self.ability
    }

    /// Returns the action name.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns whether the invocation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the human-readable message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the structured data payload (empty on failure).
    #[must_use]
    pub const fn data(&self) -> &Parameters {
        &self.data
    }

    /// Returns the error description on failure.
    #[must_use]
    pub const fn error(&self) -> Option<&InvocationError> {
        self.error.as_ref()
    }

    /// Returns the error kind on failure.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(InvocationError::kind)
    }

    /// Returns the wall-clock duration of the attempt.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the completion timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
