//! Chain definitions and their structural validation.

use super::{ChainDefinitionError, ChainDefinitionResult, ChainStep, ParameterBinding, StepId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What a chain does when a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed step.
    #[default]
    FailFast,
    /// Keep going; steps reading the failed step see the absent marker.
    ContinueOnFailure,
}

impl FailurePolicy {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail_fast",
            Self::ContinueOnFailure => "continue_on_failure",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FailurePolicy {
    type Error = ChainDefinitionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "continue_on_failure" | "continue" => Ok(Self::ContinueOnFailure),
            other => Err(ChainDefinitionError::UnknownFailurePolicy(other.to_owned())),
        }
    }
}

/// An ordered, validated pipeline of steps.
///
/// Construction checks that step identifiers are unique and that every
/// binding and predicate only reads steps that run earlier.
#[derive(Debug, Clone)]
pub struct ChainDefinition {
    name: String,
    steps: Vec<ChainStep>,
    failure_policy: FailurePolicy,
}

impl ChainDefinition {
    /// Starts building a chain.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ChainBuilder {
        ChainBuilder {
            name: name.into(),
            steps: Vec::new(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Creates a chain from its parts.
    ///
    /// # Errors
    ///
    /// Returns a [`ChainDefinitionError`] describing the first structural
    /// problem found.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<ChainStep>,
        failure_policy: FailurePolicy,
    ) -> ChainDefinitionResult<Self> {
        let trimmed = name.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(ChainDefinitionError::EmptyName);
        }
        check_steps(&steps)?;
        Ok(Self {
            name: trimmed,
            steps,
            failure_policy,
        })
    }

    /// Returns the chain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Returns one step by identifier.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&ChainStep> {
        self.steps.iter().find(|step| step.id() == id)
    }

    /// Returns the failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns whether the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ChainDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chain '{}' ({})", self.name, self.failure_policy)?;
        if self.steps.is_empty() {
            return write!(f, "\n  (no steps)");
        }
        for (position, step) in (1..).zip(&self.steps) {
            write!(
                f,
                "\n  {position}. {}: {}.{}",
                step.id(),
                step.ability(),
                step.action()
            )?;
            if let Some(predicate) = step.predicate() {
                write!(f, " when {predicate}")?;
            }
            for (parameter, binding) in step.bindings() {
                write!(f, "\n       {parameter} <- {binding}")?;
            }
        }
        Ok(())
    }
}

/// Incremental builder for [`ChainDefinition`].
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    name: String,
    steps: Vec<ChainStep>,
    failure_policy: FailurePolicy,
}

impl ChainBuilder {
    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: ChainStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Keeps running after a step fails.
    #[must_use]
    pub const fn continue_on_failure(self) -> Self {
        self.with_failure_policy(FailurePolicy::ContinueOnFailure)
    }

    /// Validates and builds the chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ChainDefinitionError`] describing the first structural
    /// problem found.
    pub fn build(self) -> ChainDefinitionResult<ChainDefinition> {
        ChainDefinition::new(self.name, self.steps, self.failure_policy)
    }
}

fn check_steps(steps: &[ChainStep]) -> ChainDefinitionResult<()> {
    let defined: HashSet<&StepId> = steps.iter().map(ChainStep::id).collect();
    let mut earlier: HashSet<&StepId> = HashSet::with_capacity(steps.len());

    for (position, step) in (1..).zip(steps) {
        if step.id().is_empty() {
            return Err(ChainDefinitionError::EmptyStepId { position });
        }
        if step.action().is_empty() {
            return Err(ChainDefinitionError::EmptyAction(step.id().clone()));
        }
        for (parameter, binding) in step.bindings() {
            if let ParameterBinding::StepOutput { path, .. } = binding
                && path.is_empty()
            {
                return Err(ChainDefinitionError::EmptyFieldPath {
                    step: step.id().clone(),
                    parameter: parameter.clone(),
                });
            }
        }
        if let Some(target) = step.dependencies().find(|target| !earlier.contains(target)) {
            let err = if defined.contains(target) {
                ChainDefinitionError::ForwardReference {
                    step: step.id().clone(),
                    target: target.clone(),
                }
            } else {
                ChainDefinitionError::UnknownStep {
                    step: step.id().clone(),
                    target: target.clone(),
                }
            };
            return Err(err);
        }
        if !earlier.insert(step.id()) {
            return Err(ChainDefinitionError::DuplicateStep(step.id().clone()));
        }
    }
    Ok(())
}
