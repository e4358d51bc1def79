//! Ability descriptor: the immutable self-description registered with an
//! ability.

use super::{
    AbilityName, DescriptorError, InvocationRequest, ParameterSpec, Parameters, RequestViolation,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Name, version, schema and supported actions of an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDescriptor {
    name: AbilityName,
    version: String,
    description: String,
    author: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    actions: BTreeSet<String>,
    parameters: Vec<ParameterSpec>,
    examples: Vec<String>,
}

impl AbilityDescriptor {
    /// Creates a descriptor with no actions or parameters.
    #[must_use]
    pub fn new(name: AbilityName, version: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into().trim().to_owned(),
            description: String::new(),
            author: None,
            category: None,
            tags: Vec::new(),
            actions: BTreeSet::new(),
            parameters: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Adds discovery tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Declares one supported action.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        let normalized = action.into().trim().to_owned();
        if !normalized.is_empty() {
            self.actions.insert(normalized);
        }
        self
    }

    /// Declares one parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds a usage example.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Returns the ability name.
    #[must_use]
    pub const fn name(&self) -> &AbilityName {
        &self.name
    }

    /// Returns the version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the author, if declared.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Returns the category, if declared.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns discovery tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the supported action names in sorted order.
    #[must_use]
    pub const fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Returns usage examples.
    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name() == name)
    }

    /// Iterates over required parameters.
    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|spec| spec.is_required())
    }

    /// Returns whether `action` is in the supported set.
    #[must_use]
    pub fn supports_action(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// Checks the descriptor's own shape.
    ///
    /// # Errors
    ///
    /// Returns the first [`DescriptorError`] found.
    pub fn check_structure(&self) -> Result<(), DescriptorError> {
        let ability = self.name.as_str();
        if self.version.is_empty() {
            return Err(DescriptorError::EmptyVersion(ability.to_owned()));
        }
        if self.actions.is_empty() {
            return Err(DescriptorError::NoActions(ability.to_owned()));
        }

        let mut seen = HashSet::new();
        for spec in &self.parameters {
            if !seen.insert(spec.name()) {
                return Err(DescriptorError::DuplicateParameter {
                    ability: ability.to_owned(),
                    parameter: spec.name().to_owned(),
                });
            }

            if let Some(default) = spec.default_value()
                && spec.check_value(default).is_err()
            {
                return Err(DescriptorError::IncompatibleDefault {
                    ability: ability.to_owned(),
                    parameter: spec.name().to_owned(),
                    expected: spec.param_type(),
                });
            }

            if spec
                .allowed_values()
                .iter()
                .any(|value| !spec.param_type().accepts(value))
            {
                return Err(DescriptorError::IncompatibleAllowedValue {
                    ability: ability.to_owned(),
                    parameter: spec.name().to_owned(),
                    expected: spec.param_type(),
                });
            }
        }

        Ok(())
    }

    /// Validates a request against this descriptor.
    ///
    /// Parameters marked absent count as missing and never fall back to a
    /// declared default.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequestViolation`] found.
    pub fn validate_request(&self, request: &InvocationRequest) -> Result<(), RequestViolation> {
        if request.ability() != &self.name {
            return Err(RequestViolation::AbilityMismatch {
                expected: self.name.as_str().to_owned(),
                actual: request.ability().as_str().to_owned(),
            });
        }

        if !self.supports_action(request.action()) {
            return Err(RequestViolation::UnsupportedAction {
                ability: self.name.as_str().to_owned(),
                action: request.action().to_owned(),
            });
        }

        for spec in &self.parameters {
            match request.parameter(spec.name()) {
                Some(value) => spec.check_value(value)?,
                None if request.is_absent(spec.name()) && spec.is_required() => {
                    return Err(RequestViolation::MissingParameter(spec.name().to_owned()));
                }
                None if spec.is_required() && spec.default_value().is_none() => {
                    return Err(RequestViolation::MissingParameter(spec.name().to_owned()));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Returns the request parameters with declared defaults filled in.
    ///
    /// The request itself is left untouched.
    #[must_use]
    pub fn resolve_parameters(&self, request: &InvocationRequest) -> Parameters {
        let mut resolved = request.parameters().clone();
        for spec in &self.parameters {
            if resolved.contains_key(spec.name()) || request.is_absent(spec.name()) {
                continue;
            }
            if let Some(default) = spec.default_value() {
                resolved.insert(spec.name().to_owned(), default.clone());
            }
        }
        resolved
    }
}
