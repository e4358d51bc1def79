//! Chain steps and the bindings that feed their parameters.

use super::{ChainContext, StepPredicate};
use crate::ability::domain::{AbilityName, Parameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Identifier of a step, unique within its chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_owned())
    }
}

impl From<String> for StepId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dotted path into a step's result data, such as `user.address.city`.
///
/// Numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parses a dotted path. Blank segments are dropped.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Returns whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Follows the path through `data`.
    #[must_use]
    pub fn lookup<'a>(&self, data: &'a Parameters) -> Option<&'a Value> {
        let (first, rest) = self.0.split_first()?;
        rest.iter().try_fold(data.get(first)?, |current, segment| match current {
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            other => other.get(segment.as_str()),
        })
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Where a step parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ParameterBinding {
    /// A fixed value.
    Static {
        /// The value.
        value: Value,
    },
    /// A field of an earlier step's result data.
    StepOutput {
        /// The earlier step.
        step: StepId,
        /// Path into its result data.
        path: FieldPath,
    },
    /// A key of the input supplied when the chain runs.
    Input {
        /// Input key.
        key: String,
    },
}

/// Outcome of resolving a binding against the run so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingResolution {
    /// The binding produced a value.
    Value(Value),
    /// The source is explicitly absent: a skipped or failed step, or an
    /// input key that was not supplied.
    Absent,
    /// The source step succeeded but its data lacks the requested field.
    MissingField {
        /// Step whose data was read.
        step: StepId,
        /// Path that did not resolve.
        path: FieldPath,
    },
}

impl ParameterBinding {
    /// Binds a fixed value.
    #[must_use]
    pub const fn fixed(value: Value) -> Self {
        Self::Static { value }
    }

    /// Binds a field of an earlier step's result data.
    #[must_use]
    pub fn step_output(step: impl Into<StepId>, path: impl Into<FieldPath>) -> Self {
        Self::StepOutput {
            step: step.into(),
            path: path.into(),
        }
    }

    /// Binds a key of the chain input.
    #[must_use]
    pub fn input(key: impl Into<String>) -> Self {
        Self::Input { key: key.into() }
    }

    /// Returns the step this binding reads, if any.
    #[must_use]
    pub const fn source_step(&self) -> Option<&StepId> {
        match self {
            Self::StepOutput { step, .. } => Some(step),
            Self::Static { .. } | Self::Input { .. } => None,
        }
    }

    /// Resolves the binding against prior results.
    ///
    /// A step that did not succeed never yields a value, so downstream
    /// parameters see the absent marker rather than a default.
    #[must_use]
    pub fn resolve(&self, context: &ChainContext) -> BindingResolution {
        match self {
            Self::Static { value } => BindingResolution::Value(value.clone()),
            Self::Input { key } => context
                .input_value(key)
                .cloned()
                .map_or(BindingResolution::Absent, BindingResolution::Value),
            Self::StepOutput { step, path } => match context.output(step) {
                None => BindingResolution::Absent,
                Some(data) => path.lookup(data).cloned().map_or_else(
                    || BindingResolution::MissingField {
                        step: step.clone(),
                        path: path.clone(),
                    },
                    BindingResolution::Value,
                ),
            },
        }
    }
}

impl fmt::Display for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { value } => write!(f, "{value}"),
            Self::StepOutput { step, path } => write!(f, "{step}.{path}"),
            Self::Input { key } => write!(f, "input.{key}"),
        }
    }
}

/// One invocation in a chain.
#[derive(Debug, Clone)]
pub struct ChainStep {
    id: StepId,
    ability: AbilityName,
    action: String,
    bindings: BTreeMap<String, ParameterBinding>,
    predicate: Option<StepPredicate>,
    timeout: Option<Duration>,
}

impl ChainStep {
    /// Creates a step invoking `ability.action` with no parameters.
    #[must_use]
    pub fn new(id: impl Into<StepId>, ability: AbilityName, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ability,
            action: action.into().trim().to_owned(),
            bindings: BTreeMap::new(),
            predicate: None,
            timeout: None,
        }
    }

    /// Binds one parameter.
    #[must_use]
    pub fn bind(mut self, parameter: impl Into<String>, binding: ParameterBinding) -> Self {
        self.bindings.insert(parameter.into(), binding);
        self
    }

    /// Binds one parameter to a fixed value.
    #[must_use]
    pub fn with_value(self, parameter: impl Into<String>, value: Value) -> Self {
        self.bind(parameter, ParameterBinding::fixed(value))
    }

    /// Binds one parameter to a field of an earlier step's result.
    #[must_use]
    pub fn with_step_output(
        self,
        parameter: impl Into<String>,
        step: impl Into<StepId>,
        path: impl Into<FieldPath>,
    ) -> Self {
        self.bind(parameter, ParameterBinding::step_output(step, path))
    }

    /// Binds one parameter to a key of the chain input.
    #[must_use]
    pub fn with_input(self, parameter: impl Into<String>, key: impl Into<String>) -> Self {
        self.bind(parameter, ParameterBinding::input(key))
    }

    /// Runs the step only when `predicate` holds.
    #[must_use]
    pub fn when(mut self, predicate: StepPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Overrides the invocation timeout for this step.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the step identifier.
    #[must_use]
    pub const fn id(&self) -> &StepId {
        &self.id
    }

    /// Returns the target ability.
    #[must_use]
    pub const fn ability(&self) -> &AbilityName {
        &self.ability
    }

    /// Returns the target action.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the parameter bindings keyed by parameter name.
    #[must_use]
    pub const fn bindings(&self) -> &BTreeMap<String, ParameterBinding> {
        &self.bindings
    }

    /// Returns the predicate guarding the step.
    #[must_use]
    pub const fn predicate(&self) -> Option<&StepPredicate> {
        self.predicate.as_ref()
    }

    /// Returns the timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns every step this step reads, through bindings or its
    /// predicate.
    pub fn dependencies(&self) -> impl Iterator<Item = &StepId> {
        self.bindings
            .values()
            .filter_map(ParameterBinding::source_step)
            .chain(self.predicate.iter().flat_map(StepPredicate::reads))
    }
}
