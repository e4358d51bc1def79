//! Ability health reporting.

use super::AbilityName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of an ability instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The instance has not been initialised.
    NotInitialized,
    /// The instance is ready.
    Healthy,
    /// The instance is running but degraded.
    Unhealthy,
}

impl HealthStatus {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Timestamped health report for one ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityHealth {
    ability: AbilityName,
    version: String,
    status: HealthStatus,
    checked_at: DateTime<Utc>,
    message: Option<String>,
}

impl AbilityHealth {
    /// Creates a health report.
    #[must_use]
    pub fn new(
        ability: AbilityName,
        version: impl Into<String>,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ability,
            version: version.into(),
            status,
            checked_at,
            message: None,
        }
    }

    /// Adds an explanatory message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let normalized = message.into().trim().to_owned();
        if !normalized.is_empty() {
            self.message = Some(normalized);
        }
        self
    }

    /// Returns the ability name.
    #[must_use]
    pub const fn ability(&self) -> &AbilityName {
        &self.ability
    }

    /// Returns the ability version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the health status.
    #[must_use]
    pub const fn status(&self) -> HealthStatus {
        self.status
    }

    /// Returns the check timestamp.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Returns the optional detail message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
