//! Per-invocation execution log entries.

use crate::ability::domain::{AbilityName, ErrorKind, InvocationResult, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of one finished invocation kept in the executor's bounded log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Request the invocation answered.
    pub request_id: RequestId,
    /// Ability that was invoked.
    pub ability: AbilityName,
    /// Action that was invoked.
    pub action: String,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Error kind on failure.
    pub error_kind: Option<ErrorKind>,
    /// Wall-clock duration of the attempt.
    pub duration: Duration,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

impl From<&InvocationResult> for ExecutionRecord {
    fn from(result: &InvocationResult) -> Self {
        Self {
            request_id: result.request_id(),
            ability: result.ability().clone(),
            action: result.action().to_owned(),
            success: result.is_success(),
            error_kind: result.error_kind(),
            duration: result.duration(),
            completed_at: result.completed_at(),
        }
    }
}
