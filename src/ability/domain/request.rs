//! Invocation request value object.

use super::{AbilityDomainError, AbilityName, RequestId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;

/// Dynamically typed parameter map passed to abilities.
pub type Parameters = Map<String, Value>;

/// One request to execute a specific ability action.
///
/// Requests are built once by the caller and never mutated afterwards; the
/// builder methods consume and return the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    id: RequestId,
    ability: AbilityName,
    action: String,
    parameters: Parameters,
    absent_parameters: BTreeSet<String>,
    caller_id: String,
    conversation_id: Option<String>,
    metadata: Parameters,
    timeout: Option<Duration>,
    created_at: DateTime<Utc>,
}

impl InvocationRequest {
    /// Creates a request with a fresh identifier and no parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityDomainError::EmptyActionName`] or
    /// [`AbilityDomainError::EmptyCallerId`] when either is blank.
    pub fn new(
        ability: AbilityName,
        action: impl Into<String>,
        caller_id: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, AbilityDomainError> {
        let normalized_action = action.into().trim().to_owned();
        if normalized_action.is_empty() {
            return Err(AbilityDomainError::EmptyActionName);
        }

        let normalized_caller = caller_id.into().trim().to_owned();
        if normalized_caller.is_empty() {
            return Err(AbilityDomainError::EmptyCallerId);
        }

        Ok(Self {
            id: RequestId::new(),
            ability,
            action: normalized_action,
            parameters: Parameters::new(),
            absent_parameters: BTreeSet::new(),
            caller_id: normalized_caller,
            conversation_id: None,
            metadata: Parameters::new(),
            timeout: None,
            created_at: clock.utc(),
        })
    }

    /// Replaces the generated identifier.
    #[must_use]
    pub const fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Adds or replaces one parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        let key = name.into();
        self.absent_parameters.remove(&key);
        self.parameters.insert(key, value);
        self
    }

    /// Merges a parameter map into the request.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        for (name, value) in parameters {
            self.absent_parameters.remove(&name);
            self.parameters.insert(name, value);
        }
        self
    }

    /// Marks a parameter as explicitly absent.
    ///
    /// An absent parameter is never filled from a declared default.
    #[must_use]
    pub fn with_absent_parameter(mut self, name: impl Into<String>) -> Self {
        let key = name.into();
        self.parameters.remove(&key);
        self.absent_parameters.insert(key);
        self
    }

    /// Sets the conversation the request belongs to.
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Adds free-form request metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Overrides the executor's default timeout for this invocation.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the target ability name.
    #[must_use]
    pub const fn ability(&self) -> &AbilityName {
        &self.ability
    }

    /// Returns the action name.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the supplied parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns one supplied parameter value.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Returns whether the parameter was explicitly marked absent.
    #[must_use]
    pub fn is_absent(&self, name: &str) -> bool {
        self.absent_parameters.contains(name)
    }

    /// Returns all parameter names marked absent.
    #[must_use]
    pub const fn absent_parameters(&self) -> &BTreeSet<String> {
        &self.absent_parameters
    }

    /// Returns the opaque caller identifier.
    #[must_use]
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Returns the conversation identifier, if any.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Returns request metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Parameters {
        &self.metadata
    }

    /// Returns the per-invocation timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
