//! Executor counters.

use serde::{Deserialize, Serialize};

/// Snapshot of executor activity since creation or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    /// Batches run, single invocations excluded.
    pub batches: u64,
    /// Invocations dispatched.
    pub invocations: u64,
    /// Invocations that succeeded.
    pub succeeded: u64,
    /// Invocations that failed.
    pub failed: u64,
    /// Requests that never started.
    pub not_started: u64,
    /// Rollback calls issued.
    pub rollbacks_attempted: u64,
    /// Rollback calls that did not complete.
    pub rollbacks_failed: u64,
}

impl ExecutionStatistics {
    /// Returns the share of dispatched invocations that succeeded, in whole
    /// percent rounded down, or `None` before anything was dispatched.
    #[must_use]
    pub const fn success_percent(&self) -> Option<u64> {
        self.succeeded.saturating_mul(100).checked_div(self.invocations)
    }
}
