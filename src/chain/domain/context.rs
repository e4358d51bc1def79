//! Accumulated state visible to bindings and predicates during a run.

use super::{FieldPath, StepId};
use crate::ability::domain::Parameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The invocation succeeded.
    Succeeded,
    /// The invocation failed, or its parameters could not be resolved.
    Failed,
    /// The step's predicate was false.
    Skipped,
    /// The chain stopped before reaching the step.
    NotRun,
}

impl StepStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::NotRun => "not_run",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain input plus the outcome of every step that has finished.
#[derive(Debug, Clone, Default)]
pub struct ChainContext {
    input: Parameters,
    statuses: HashMap<StepId, StepStatus>,
    outputs: HashMap<StepId, Parameters>,
}

impl ChainContext {
    /// Creates a context holding only the chain input.
    #[must_use]
    pub fn new(input: Parameters) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Returns the chain input.
    #[must_use]
    pub const fn input(&self) -> &Parameters {
        &self.input
    }

    /// Returns one input value.
    #[must_use]
    pub fn input_value(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    /// Returns how `step` ended, or `None` when it has not finished.
    #[must_use]
    pub fn status(&self, step: &StepId) -> Option<StepStatus> {
        self.statuses.get(step).copied()
    }

    /// Returns the result data of `step` when it succeeded.
    #[must_use]
    pub fn output(&self, step: &StepId) -> Option<&Parameters> {
        self.outputs.get(step)
    }

    /// Returns one field of a succeeded step's result data.
    #[must_use]
    pub fn field(&self, step: &StepId, path: &FieldPath) -> Option<&Value> {
        self.output(step).and_then(|data| path.lookup(data))
    }

    pub(crate) fn record_success(&mut self, step: StepId, data: Parameters) {
        self.statuses.insert(step.clone(), StepStatus::Succeeded);
        self.outputs.insert(step, data);
    }

    pub(crate) fn record(&mut self, step: StepId, status: StepStatus) {
        self.outputs.remove(&step);
        self.statuses.insert(step, status);
    }
}
