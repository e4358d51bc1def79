//! Chain run inputs, progress and outcomes.

use super::{StepId, StepStatus};
use crate::ability::domain::{
    AbilityDomainError, AbilityName, InvocationResult, Parameters,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Caller identity and input values for one chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInput {
    caller_id: String,
    conversation_id: Option<String>,
    values: Parameters,
}

impl ChainInput {
    /// Creates an empty input on behalf of `caller_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityDomainError::EmptyCallerId`] when the caller is
    /// blank.
    pub fn new(caller_id: impl Into<String>) -> Result<Self, AbilityDomainError> {
        let caller = caller_id.into().trim().to_owned();
        if caller.is_empty() {
            return Err(AbilityDomainError::EmptyCallerId);
        }
        Ok(Self {
            caller_id: caller,
            conversation_id: None,
            values: Parameters::new(),
        })
    }

    /// Adds one input value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Merges an input map.
    #[must_use]
    pub fn with_values(mut self, values: Parameters) -> Self {
        self.values.extend(values);
        self
    }

    /// Sets the conversation every step request belongs to.
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Returns the caller identifier.
    #[must_use]
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Returns the conversation identifier.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Returns the input values.
    #[must_use]
    pub const fn values(&self) -> &Parameters {
        &self.values
    }
}

/// Terminal status of a chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    /// No step failed.
    Succeeded,
    /// At least one step failed.
    Failed,
    /// Cancellation stopped the run before every step was considered.
    Aborted,
}

impl ChainStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a chain run.
///
/// `pending -> running(step) -> ... -> finished(status)`; a finished run
/// never changes state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainRunState {
    /// Not started.
    Pending,
    /// Considering the step at this zero-based position.
    Running(usize),
    /// Reached a terminal status.
    Finished(ChainStatus),
}

impl ChainRunState {
    /// Moves to the step at `index`. Finished runs stay finished.
    #[must_use]
    pub const fn advance(self, index: usize) -> Self {
        match self {
            Self::Pending | Self::Running(_) => Self::Running(index),
            Self::Finished(_) => self,
        }
    }

    /// Moves to a terminal status. Finished runs keep their first status.
    #[must_use]
    pub const fn finish(self, status: ChainStatus) -> Self {
        match self {
            Self::Pending | Self::Running(_) => Self::Finished(status),
            Self::Finished(_) => self,
        }
    }

    /// Returns whether the run has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Returns the terminal status once finished.
    #[must_use]
    pub const fn status(self) -> Option<ChainStatus> {
        match self {
            Self::Finished(status) => Some(status),
            Self::Pending | Self::Running(_) => None,
        }
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step identifier.
    pub step: StepId,
    /// Target ability.
    pub ability: AbilityName,
    /// How the step ended.
    pub status: StepStatus,
    /// Invocation result, present for succeeded and failed steps.
    pub result: Option<InvocationResult>,
    /// Why the step was skipped or not run.
    pub reason: Option<String>,
}

impl StepRecord {
    /// Returns the result data when the step succeeded.
    #[must_use]
    pub fn output(&self) -> Option<&Parameters> {
        self.result
            .as_ref()
            .filter(|result| result.is_success())
            .map(InvocationResult::data)
    }
}

/// Outcome of one chain run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRun {
    /// Identifier of this run, carried by every event it published.
    pub run_id: Uuid,
    /// Chain name.
    pub chain: String,
    /// Terminal status.
    pub status: ChainStatus,
    /// One record per defined step, in definition order.
    pub steps: Vec<StepRecord>,
    /// Wall-clock time for the whole run.
    pub duration: Duration,
}

impl ChainRun {
    /// Returns the results of steps that ran, in step order.
    pub fn results(&self) -> impl Iterator<Item = &InvocationResult> {
        self.steps.iter().filter_map(|record| record.result.as_ref())
    }

    /// Returns the record of one step.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&StepRecord> {
        self.steps.iter().find(|record| &record.step == id)
    }

    /// Returns the status of one step.
    #[must_use]
    pub fn step_status(&self, id: &StepId) -> Option<StepStatus> {
        self.step(id).map(|record| record.status)
    }

    /// Returns whether the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ChainStatus::Succeeded
    }
}
