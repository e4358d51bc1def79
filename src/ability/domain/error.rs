//! Error types for ability domain validation.

use super::ParameterType;
use thiserror::Error;

/// Errors returned while constructing ability domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbilityDomainError {
    /// The ability name is empty after trimming.
    #[error("ability name must not be empty")]
    EmptyAbilityName,

    /// The ability name contains characters outside `[a-z0-9_]`.
    #[error(
        "ability name '{0}' contains invalid characters (only lowercase alphanumeric and underscores allowed)"
    )]
    InvalidAbilityName(String),

    /// The ability name exceeds the 100-character limit.
    #[error("ability name exceeds 100 character limit: {0}")]
    AbilityNameTooLong(String),

    /// The action name is empty after trimming.
    #[error("action name must not be empty")]
    EmptyActionName,

    /// The caller identifier is empty after trimming.
    #[error("caller identifier must not be empty")]
    EmptyCallerId,

    /// A parameter name is empty after trimming.
    #[error("parameter name must not be empty")]
    EmptyParameterName,
}

/// Structural problems found in an [`super::AbilityDescriptor`].
///
/// These are reported at registration time so execution never has to
/// re-check the shape of an ability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// The descriptor declares no actions.
    #[error("ability '{0}' declares no supported actions")]
    NoActions(String),

    /// The descriptor version is empty.
    #[error("ability '{0}' has an empty version")]
    EmptyVersion(String),

    /// Two parameters share a name.
    #[error("ability '{ability}' declares parameter '{parameter}' more than once")]
    DuplicateParameter {
        /// Ability name.
        ability: String,
        /// Duplicated parameter name.
        parameter: String,
    },

    /// A parameter default does not satisfy the parameter's own constraints.
    #[error("default for parameter '{parameter}' of ability '{ability}' is not a valid {expected}")]
    IncompatibleDefault {
        /// Ability name.
        ability: String,
        /// Parameter name.
        parameter: String,
        /// Declared parameter type.
        expected: ParameterType,
    },

    /// An allowed value does not match the parameter type tag.
    #[error("allowed value for parameter '{parameter}' of ability '{ability}' is not a {expected}")]
    IncompatibleAllowedValue {
        /// Ability name.
        ability: String,
        /// Parameter name.
        parameter: String,
        /// Declared parameter type.
        expected: ParameterType,
    },
}

/// Reasons a request fails an ability's own validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestViolation {
    /// The request targets a different ability.
    #[error("request targets ability '{actual}' but was sent to '{expected}'")]
    AbilityMismatch {
        /// Ability that received the request.
        expected: String,
        /// Ability named by the request.
        actual: String,
    },

    /// The action is not in the ability's supported set.
    #[error("ability '{ability}' does not support action '{action}'")]
    UnsupportedAction {
        /// Ability name.
        ability: String,
        /// Requested action.
        action: String,
    },

    /// A required parameter is missing or resolved to the absent marker.
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    /// A parameter value has the wrong type.
    #[error("parameter '{parameter}' must be a {expected}")]
    TypeMismatch {
        /// Parameter name.
        parameter: String,
        /// Declared parameter type.
        expected: ParameterType,
    },

    /// A parameter value is outside the declared allowed set.
    #[error("parameter '{0}' is not one of the allowed values")]
    ValueNotAllowed(String),

    /// A numeric parameter is outside its declared range.
    #[error("parameter '{0}' is out of range")]
    OutOfRange(String),

    /// A string or list parameter has a length outside its declared bounds.
    #[error("parameter '{0}' has an invalid length")]
    InvalidLength(String),
}

/// Error returned while parsing a parameter type tag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown parameter type: {0}")]
pub struct ParseParameterTypeError(pub String);

/// Error returned while parsing an invocation error kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown invocation error kind: {0}")]
pub struct ParseErrorKindError(pub String);

/// Error returned while parsing an ability lifecycle state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown ability state: {0}")]
pub struct ParseAbilityStateError(pub String);
