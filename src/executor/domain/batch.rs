//! Execution batches and their policies.

use crate::ability::domain::{InvocationRequest, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;
use uuid::Uuid;

/// How the requests of a batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One at a time, in submission order.
    Sequential,
    /// Independent tasks bounded by an in-flight limit.
    Concurrent,
}

impl ExecutionMode {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ExecutionMode {
    type Error = BatchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" | "parallel" => Ok(Self::Concurrent),
            other => Err(BatchError::UnknownMode(other.to_owned())),
        }
    }
}

/// What happens to completed work when part of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Failures are reported as-is.
    #[default]
    None,
    /// Failed requests are rolled back where supported; rollback failures
    /// never change the batch status.
    BestEffort,
    /// Any failure rolls back every success; a failed rollback degrades the
    /// batch.
    AllOrNothing,
}

impl RollbackPolicy {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BestEffort => "best_effort",
            Self::AllOrNothing => "all_or_nothing",
        }
    }
}

impl fmt::Display for RollbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RollbackPolicy {
    type Error = BatchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Self::None),
            "best_effort" => Ok(Self::BestEffort),
            "all_or_nothing" => Ok(Self::AllOrNothing),
            other => Err(BatchError::UnknownPolicy(other.to_owned())),
        }
    }
}

/// Errors raised while building a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    /// Two requests share an identifier.
    #[error("request {0} appears more than once in the batch")]
    DuplicateRequestId(RequestId),

    /// Unrecognised execution mode name.
    #[error("unknown execution mode: {0}")]
    UnknownMode(String),

    /// Unrecognised rollback policy name.
    #[error("unknown rollback policy: {0}")]
    UnknownPolicy(String),
}

/// Requests submitted together under one execution and rollback policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionBatch {
    id: Uuid,
    requests: Vec<InvocationRequest>,
    mode: ExecutionMode,
    rollback: RollbackPolicy,
    max_in_flight: Option<NonZeroUsize>,
}

impl ExecutionBatch {
    /// Creates a batch.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateRequestId`] when request identifiers
    /// are not unique.
    pub fn new(
        requests: Vec<InvocationRequest>,
        mode: ExecutionMode,
        rollback: RollbackPolicy,
    ) -> Result<Self, BatchError> {
        let mut seen = HashSet::with_capacity(requests.len());
        if let Some(duplicate) = requests.iter().find(|request| !seen.insert(request.id())) {
            return Err(BatchError::DuplicateRequestId(duplicate.id()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            requests,
            mode,
            rollback,
            max_in_flight: None,
        })
    }

    /// Creates a sequential batch without rollback.
    ///
    /// # Errors
    ///
    /// See [`ExecutionBatch::new`].
    pub fn sequential(requests: Vec<InvocationRequest>) -> Result<Self, BatchError> {
        Self::new(requests, ExecutionMode::Sequential, RollbackPolicy::None)
    }

    /// Creates a concurrent batch without rollback.
    ///
    /// # Errors
    ///
    /// See [`ExecutionBatch::new`].
    pub fn concurrent(requests: Vec<InvocationRequest>) -> Result<Self, BatchError> {
        Self::new(requests, ExecutionMode::Concurrent, RollbackPolicy::None)
    }

    /// Sets the rollback policy.
    #[must_use]
    pub const fn with_rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// Overrides the executor's in-flight bound for this batch.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: NonZeroUsize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    /// Returns the batch identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the requests in submission order.
    #[must_use]
    pub fn requests(&self) -> &[InvocationRequest] {
        &self.requests
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the rollback policy.
    #[must_use]
    pub const fn rollback(&self) -> RollbackPolicy {
        self.rollback
    }

    /// Returns the batch-specific in-flight bound, if any.
    #[must_use]
    pub const fn max_in_flight(&self) -> Option<NonZeroUsize> {
        self.max_in_flight
    }

    /// Returns the number of requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns whether the batch has no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
