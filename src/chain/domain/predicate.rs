//! Conditions deciding whether a step runs.

use super::{ChainContext, FieldPath, StepId, StepStatus};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&ChainContext) -> bool + Send + Sync;

#[derive(Clone)]
enum Condition {
    Succeeded(StepId),
    Failed(StepId),
    FieldEquals {
        step: StepId,
        path: FieldPath,
        value: Value,
    },
    InputPresent(String),
    Custom {
        label: String,
        check: Arc<PredicateFn>,
    },
}

/// Condition evaluated against prior results before a step runs.
///
/// Every predicate declares the steps it reads so the chain can reject
/// references to steps that have not run yet.
#[derive(Clone)]
pub struct StepPredicate {
    condition: Condition,
    reads: Vec<StepId>,
}

impl StepPredicate {
    /// Holds when `step` succeeded.
    #[must_use]
    pub fn succeeded(step: impl Into<StepId>) -> Self {
        let target: StepId = step.into();
        Self {
            reads: vec![target.clone()],
            condition: Condition::Succeeded(target),
        }
    }

    /// Holds when `step` failed.
    #[must_use]
    pub fn failed(step: impl Into<StepId>) -> Self {
        let target: StepId = step.into();
        Self {
            reads: vec![target.clone()],
            condition: Condition::Failed(target),
        }
    }

    /// Holds when `step` succeeded and the field at `path` equals `value`.
    #[must_use]
    pub fn field_equals(
        step: impl Into<StepId>,
        path: impl Into<FieldPath>,
        value: Value,
    ) -> Self {
        let target: StepId = step.into();
        Self {
            reads: vec![target.clone()],
            condition: Condition::FieldEquals {
                step: target,
                path: path.into(),
                value,
            },
        }
    }

    /// Holds when the chain input contains `key`.
    #[must_use]
    pub fn input_present(key: impl Into<String>) -> Self {
        Self {
            reads: Vec::new(),
            condition: Condition::InputPresent(key.into()),
        }
    }

    /// Wraps a closure reading the steps listed in `reads`.
    #[must_use]
    pub fn custom<F, I>(label: impl Into<String>, reads: I, check: F) -> Self
    where
        F: Fn(&ChainContext) -> bool + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Into<StepId>,
    {
        Self {
            reads: reads.into_iter().map(Into::into).collect(),
            condition: Condition::Custom {
                label: label.into(),
                check: Arc::new(check),
            },
        }
    }

    /// Returns the steps this predicate reads.
    #[must_use]
    pub fn reads(&self) -> &[StepId] {
        &self.reads
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn evaluate(&self, context: &ChainContext) -> bool {
        match &self.condition {
            Condition::Succeeded(step) => context.status(step) == Some(StepStatus::Succeeded),
            Condition::Failed(step) => context.status(step) == Some(StepStatus::Failed),
            Condition::FieldEquals { step, path, value } => {
                context.field(step, path) == Some(value)
            }
            Condition::InputPresent(key) => context.input_value(key).is_some(),
            Condition::Custom { check, .. } => check(context),
        }
    }
}

impl fmt::Display for StepPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Succeeded(step) => write!(f, "{step} succeeded"),
            Condition::Failed(step) => write!(f, "{step} failed"),
            Condition::FieldEquals { step, path, value } => write!(f, "{step}.{path} == {value}"),
            Condition::InputPresent(key) => write!(f, "input.{key} present"),
            Condition::Custom { label, .. } => f.write_str(label),
        }
    }
}

impl fmt::Debug for StepPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepPredicate")
            .field("condition", &self.to_string())
            .field("reads", &self.reads)
            .finish()
    }
}
