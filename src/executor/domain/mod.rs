//! Executor domain: batches, outcomes, counters and the execution log.

mod batch;
mod history;
mod outcome;
mod statistics;

pub use batch::{BatchError, ExecutionBatch, ExecutionMode, RollbackPolicy};
pub use history::ExecutionRecord;
pub use outcome::{
    BatchEntry, BatchOutcome, BatchStatus, NotStartedReason, RollbackRecord, RollbackStatus,
};
pub use statistics::ExecutionStatistics;
