//! Engine configuration.
//!
//! Configuration is plain data: every field has a default, so an empty JSON
//! object is a valid configuration. Values are checked by
//! [`EngineConfig::validate`] before any component is built from them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_IN_FLIGHT: usize = 5;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),

    /// `max_in_flight` must be positive.
    #[error("executor.max_in_flight must be greater than zero")]
    ZeroMaxInFlight,

    /// A configured timeout was zero.
    #[error("{0} must be greater than zero when set")]
    ZeroTimeout(&'static str),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Action and chain executor settings.
    pub executor: ExecutorConfig,
    /// Event bus settings.
    pub events: EventBusConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and the
    /// validation errors of [`EngineConfig::validate`].
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.executor.validate()
    }
}

/// Executor settings shared by the action and chain executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently running invocations per batch.
    pub max_in_flight: usize,
    /// Per-invocation timeout in milliseconds; `None` disables it.
    pub default_timeout_ms: Option<u64>,
    /// Timeout for a single rollback call; falls back to the invocation
    /// timeout when unset.
    pub rollback_timeout_ms: Option<u64>,
    /// Number of finished invocations kept in the execution log; `0`
    /// disables the log.
    pub history_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            default_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            rollback_timeout_ms: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ExecutorConfig {
    /// Sets the in-flight bound.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Sets or disables the per-invocation timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout_ms = timeout.map(duration_to_millis);
        self
    }

    /// Sets the rollback timeout.
    #[must_use]
    pub fn with_rollback_timeout(mut self, timeout: Duration) -> Self {
        self.rollback_timeout_ms = Some(duration_to_millis(timeout));
        self
    }

    /// Sets the execution log capacity.
    #[must_use]
    pub const fn with_history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = history_capacity;
        self
    }

    /// Returns the per-invocation timeout, if enabled.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    /// Returns the timeout applied to each rollback call.
    #[must_use]
    pub fn rollback_timeout(&self) -> Option<Duration> {
        self.rollback_timeout_ms
            .map(Duration::from_millis)
            .or_else(|| self.default_timeout())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        if matches!(self.default_timeout_ms, Some(0)) {
            return Err(ConfigError::ZeroTimeout("executor.default_timeout_ms"));
        }
        if matches!(self.rollback_timeout_ms, Some(0)) {
            return Err(ConfigError::ZeroTimeout("executor.rollback_timeout_ms"));
        }
        Ok(())
    }
}

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventBusConfig {
    /// Number of events retained for inspection; `0` disables history.
    pub history_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl EventBusConfig {
    /// Sets the history capacity.
    #[must_use]
    pub const fn with_history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = history_capacity;
        self
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
