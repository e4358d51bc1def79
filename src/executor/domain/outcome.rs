//! Batch outcomes: per-request entries, rollback records and status.

use crate::ability::domain::{AbilityName, InvocationResult, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Why a request in a batch never ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotStartedReason {
    /// An earlier failure halted an all-or-nothing batch.
    HaltedAfterFailure,
    /// The batch was cancelled or the executor shut down.
    Cancelled,
}

impl NotStartedReason {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HaltedAfterFailure => "halted_after_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for NotStartedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry per submitted request, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum BatchEntry {
    /// The request ran; its result is attached.
    Completed(InvocationResult),
    /// The request was never dispatched.
    NotStarted {
        /// Identifier of the request.
        request_id: RequestId,
        /// Target ability.
        ability: AbilityName,
        /// Why it did not run.
        reason: NotStartedReason,
    },
}

impl BatchEntry {
    /// Returns the request identifier.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::Completed(result) => result.request_id(),
            Self::NotStarted { request_id, .. } => *request_id,
        }
    }

    /// Returns the target ability.
    #[must_use]
    pub const fn ability(&self) -> &AbilityName {
        match self {
            Self::Completed(result) => result.ability(),
            Self::NotStarted { ability, .. } => ability,
        }
    }

    /// Returns the result when the request ran.
    #[must_use]
    pub const fn result(&self) -> Option<&InvocationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::NotStarted { .. } => None,
        }
    }

    /// Returns whether the request ran and succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed(result) if result.is_success())
    }

    /// Returns the reason the request did not run, if it did not.
    #[must_use]
    pub const fn not_started_reason(&self) -> Option<NotStartedReason> {
        match self {
            Self::Completed(_) => None,
            Self::NotStarted { reason, .. } => Some(*reason),
        }
    }
}

/// Outcome of one rollback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// The compensating action completed.
    RolledBack,
    /// The ability cannot undo its work.
    Unsupported,
    /// The compensating action failed or timed out.
    Failed,
}

impl RollbackStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RolledBack => "rolled_back",
            Self::Unsupported => "unsupported",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RollbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a rollback attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Request being compensated.
    pub request_id: RequestId,
    /// Ability asked to roll back.
    pub ability: AbilityName,
    /// What happened.
    pub status: RollbackStatus,
    /// Failure detail, when any.
    pub message: Option<String>,
}

impl RollbackRecord {
    /// Returns whether the rollback completed.
    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.status == RollbackStatus::RolledBack
    }
}

/// Terminal status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every request ran and succeeded.
    Succeeded,
    /// At least one request failed.
    Failed,
    /// An all-or-nothing rollback could not undo every success.
    Degraded,
    /// Cancellation stopped the batch before every request started.
    Aborted,
}

impl BatchStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Degraded => "degraded",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete, ordered outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Batch identifier.
    pub batch_id: Uuid,
    /// Terminal status.
    pub status: BatchStatus,
    /// One entry per submitted request, in submission order.
    pub entries: Vec<BatchEntry>,
    /// Rollback attempts in the order they were issued.
    pub rollbacks: Vec<RollbackRecord>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl BatchOutcome {
    /// Returns results of requests that ran, in submission order.
    pub fn results(&self) -> impl Iterator<Item = &InvocationResult> {
        self.entries.iter().filter_map(BatchEntry::result)
    }

    /// Returns the entry for `request_id`.
    #[must_use]
    pub fn entry(&self, request_id: RequestId) -> Option<&BatchEntry> {
        self.entries
            .iter()
            .find(|entry| entry.request_id() == request_id)
    }

    /// Returns the rollback record for `request_id`.
    #[must_use]
    pub fn rollback_for(&self, request_id: RequestId) -> Option<&RollbackRecord> {
        self.rollbacks
            .iter()
            .find(|record| record.request_id == request_id)
    }

    /// Returns whether the batch succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }

    /// Returns the number of entries that ran and succeeded.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_success()).count()
    }

    /// Returns the number of entries that ran and failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results().filter(|result| !result.is_success()).count()
    }

    /// Returns the number of entries that never ran.
    #[must_use]
    pub fn not_started_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.result().is_none())
            .count()
    }
}
