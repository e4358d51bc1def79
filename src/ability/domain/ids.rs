//! Identifier and validated-name types for abilities and invocations.

use super::AbilityDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for an ability name.
const MAX_ABILITY_NAME_LENGTH: usize = 100;

/// Validated, unique ability name used as the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbilityName(String);

impl AbilityName {
    /// Creates a validated ability name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, AbilityDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(AbilityDomainError::EmptyAbilityName);
        }

        let is_valid = normalized.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });
        if !is_valid {
            return Err(AbilityDomainError::InvalidAbilityName(normalized));
        }

        if normalized.len() > MAX_ABILITY_NAME_LENGTH {
            return Err(AbilityDomainError::AbilityNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the ability name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AbilityName {
    type Error = AbilityDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AbilityName> for String {
    fn from(value: AbilityName) -> Self {
        value.0
    }
}

impl AsRef<str> for AbilityName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AbilityName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Unique identifier for one invocation request.
///
/// Results and rollback calls are correlated to requests through this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for RequestId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
