//! Errors raised while defining a chain.

use super::StepId;
use thiserror::Error;

/// Structural problems found when a chain definition is built.
///
/// Every reference is checked here, before any step runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainDefinitionError {
    /// The chain name is empty after trimming.
    #[error("chain name must not be empty")]
    EmptyName,

    /// A step identifier is empty after trimming.
    #[error("step {position} has an empty identifier")]
    EmptyStepId {
        /// One-based position of the step.
        position: usize,
    },

    /// A step action is empty after trimming.
    #[error("step '{0}' has an empty action name")]
    EmptyAction(StepId),

    /// Two steps share an identifier.
    #[error("step '{0}' is defined more than once")]
    DuplicateStep(StepId),

    /// A step reads a step defined after it, or itself.
    #[error("step '{step}' references '{target}', which does not run before it")]
    ForwardReference {
        /// Step holding the reference.
        step: StepId,
        /// Referenced step.
        target: StepId,
    },

    /// A step reads a step the chain does not define.
    #[error("step '{step}' references unknown step '{target}'")]
    UnknownStep {
        /// Step holding the reference.
        step: StepId,
        /// Referenced step.
        target: StepId,
    },

    /// A step-output binding has an empty field path.
    #[error("parameter '{parameter}' of step '{step}' has an empty field path")]
    EmptyFieldPath {
        /// Step holding the binding.
        step: StepId,
        /// Bound parameter.
        parameter: String,
    },

    /// Unrecognised failure policy name.
    #[error("unknown chain failure policy: {0}")]
    UnknownFailurePolicy(String),
}

/// Result type for chain definition operations.
pub type ChainDefinitionResult<T> = Result<T, ChainDefinitionError>;
