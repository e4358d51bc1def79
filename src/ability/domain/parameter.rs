//! Declared parameter schema for ability actions.

use super::{AbilityDomainError, ParseParameterTypeError, RequestViolation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type tag for a declared ability parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// UTF-8 string.
    String,
    /// Signed or unsigned integer.
    Integer,
    /// Any JSON number.
    Float,
    /// Boolean flag.
    Boolean,
    /// JSON array.
    List,
    /// JSON object.
    Map,
    /// Any value.
    Any,
}

impl ParameterType {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Map => "map",
            Self::Any => "any",
        }
    }

    /// Returns whether `value` satisfies this type tag.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ParameterType {
    type Error = ParseParameterTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "list" => Ok(Self::List),
            "map" | "dict" => Ok(Self::Map),
            "any" => Ok(Self::Any),
            _ => Err(ParseParameterTypeError(value.to_owned())),
        }
    }
}

/// Declared schema for one action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    name: String,
    param_type: ParameterType,
    description: String,
    required: bool,
    default: Option<Value>,
    allowed_values: Vec<Value>,
    min: Option<f64>,
    max: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl ParameterSpec {
    /// Creates a required parameter with the given type tag.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityDomainError::EmptyParameterName`] when the name is
    /// empty after trimming.
    pub fn new(
        name: impl Into<String>,
        param_type: ParameterType,
    ) -> Result<Self, AbilityDomainError> {
        let normalized = name.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(AbilityDomainError::EmptyParameterName);
        }

        Ok(Self {
            name: normalized,
            param_type,
            description: String::new(),
            required: true,
            default: None,
            allowed_values: Vec::new(),
            min: None,
            max: None,
            min_length: None,
            max_length: None,
        })
    }

    /// Marks the parameter as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_owned();
        self
    }

    /// Sets the default used when the caller omits the parameter.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restricts the parameter to an explicit set of values.
    #[must_use]
    pub fn with_allowed_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed_values = values.into_iter().collect();
        self
    }

    /// Bounds a numeric parameter (inclusive).
    #[must_use]
    pub const fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Bounds the length of a string or list parameter (inclusive).
    #[must_use]
    pub const fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type tag.
    #[must_use]
    pub const fn param_type(&self) -> ParameterType {
        self.param_type
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns whether the parameter must be supplied.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the declared default, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the allowed-value set; empty means unrestricted.
    #[must_use]
    pub fn allowed_values(&self) -> &[Value] {
        &self.allowed_values
    }

    /// Checks a supplied value against the type tag and constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequestViolation`] found.
    pub fn check_value(&self, value: &Value) -> Result<(), RequestViolation> {
        if !self.param_type.accepts(value) {
            return Err(RequestViolation::TypeMismatch {
                parameter: self.name.clone(),
                expected: self.param_type,
            });
        }

        if !self.allowed_values.is_empty() && !self.allowed_values.contains(value) {
            return Err(RequestViolation::ValueNotAllowed(self.name.clone()));
        }

        if let Some(number) = value.as_f64() {
            let below = self.min.is_some_and(|min| number < min);
            let above = self.max.is_some_and(|max| number > max);
            if below || above {
                return Err(RequestViolation::OutOfRange(self.name.clone()));
            }
        }

        if let Some(length) = measured_length(value) {
            let too_short = self.min_length.is_some_and(|min| length < min);
            let too_long = self.max_length.is_some_and(|max| length > max);
            if too_short || too_long {
                return Err(RequestViolation::InvalidLength(self.name.clone()));
            }
        }

        Ok(())
    }
}

fn measured_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
