//! Batch execution with bounded concurrency and rollback policies.

use crate::ability::{
    domain::{InvocationRequest, InvocationResult},
    services::AbilityInstance,
};
use crate::config::ExecutorConfig;
use crate::events::{
    domain::{EventKind, EventPayload},
    services::EventBus,
};
use crate::executor::domain::{
    BatchEntry, BatchOutcome, BatchStatus, ExecutionBatch, ExecutionMode, ExecutionRecord,
    ExecutionStatistics, NotStartedReason, RollbackPolicy, RollbackRecord,
};
use crate::executor::services::{Dispatched, InvocationDispatcher};
use crate::registry::services::CapabilityRegistry;
use futures::stream::{FuturesUnordered, StreamExt};
use mockable::Clock;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Conditions that stop a run from producing an outcome.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor was shut down before the run started.
    #[error("executor has been shut down")]
    ShutDown,
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Default)]
struct Counters {
    batches: AtomicU64,
    invocations: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    not_started: AtomicU64,
    rollbacks_attempted: AtomicU64,
    rollbacks_failed: AtomicU64,
}

impl Counters {
    fn record_result(&self, result: &InvocationResult) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_rollback(&self, record: &RollbackRecord) {
        self.rollbacks_attempted.fetch_add(1, Ordering::Relaxed);
        if !record.is_rolled_back() {
            self.rollbacks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> ExecutionStatistics {
        ExecutionStatistics {
            batches: self.batches.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            not_started: self.not_started.load(Ordering::Relaxed),
            rollbacks_attempted: self.rollbacks_attempted.load(Ordering::Relaxed),
            rollbacks_failed: self.rollbacks_failed.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.batches,
            &self.invocations,
            &self.succeeded,
            &self.failed,
            &self.not_started,
            &self.rollbacks_attempted,
            &self.rollbacks_failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Bounded log of finished invocations, oldest evicted first.
struct ExecutionLog {
    capacity: usize,
    records: Mutex<VecDeque<ExecutionRecord>>,
}

impl ExecutionLog {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn push(&self, result: &InvocationResult) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(ExecutionRecord::from(result));
    }

    fn recent(&self, limit: Option<usize>) -> Vec<ExecutionRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Per-run bookkeeping shared by both scheduling modes.
struct BatchRun<'a> {
    requests: &'a [InvocationRequest],
    slots: Vec<Option<BatchEntry>>,
    instances: Vec<Option<Arc<AbilityInstance>>>,
    completion_order: Vec<usize>,
    failed: Vec<usize>,
    cancelled: bool,
}

impl<'a> BatchRun<'a> {
    fn new(requests: &'a [InvocationRequest]) -> Self {
        Self {
            requests,
            slots: vec![None; requests.len()],
            instances: vec![None; requests.len()],
            completion_order: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }

    fn complete(&mut self, index: usize, dispatched: Dispatched) {
        if dispatched.result.is_success() {
            self.completion_order.push(index);
        } else {
            self.failed.push(index);
        }
        if let Some(slot) = self.instances.get_mut(index) {
            *slot = dispatched.instance;
        }
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(BatchEntry::Completed(dispatched.result));
        }
    }

    fn skip(&mut self, index: usize, reason: NotStartedReason) {
        if reason == NotStartedReason::Cancelled {
            self.cancelled = true;
        }
        let Some(request) = self.requests.get(index) else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(BatchEntry::NotStarted {
                request_id: request.id(),
                ability: request.ability().clone(),
                reason,
            });
        }
    }

    fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    fn into_entries(self) -> Vec<BatchEntry> {
        self.slots.into_iter().flatten().collect()
    }
}

/// Runs batches of invocations.
///
/// Per-invocation failures never escape: they are captured in the batch
/// outcome. Only shutdown before a run starts is reported as an error.
/// Every finished invocation is counted and summarized in a bounded
/// execution log sized by [`ExecutorConfig::history_capacity`].
pub struct ActionExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    dispatcher: Arc<InvocationDispatcher<C>>,
    counters: Counters,
    log: ExecutionLog,
    shutdown: CancellationToken,
}

impl<C> std::fmt::Debug for ActionExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("dispatcher", &self.dispatcher)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl<C> ActionExecutor<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates an executor resolving abilities through `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<CapabilityRegistry<C>>,
        events: Arc<EventBus<C>>,
        config: ExecutorConfig,
        clock: Arc<C>,
    ) -> Self {
        Self::with_dispatcher(Arc::new(InvocationDispatcher::new(
            registry, events, config, clock,
        )))
    }

    /// Creates an executor sharing an existing dispatcher.
    #[must_use]
    pub fn with_dispatcher(dispatcher: Arc<InvocationDispatcher<C>>) -> Self {
        let log = ExecutionLog::new(dispatcher.config().history_capacity);
        Self {
            dispatcher,
            counters: Counters::default(),
            log,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<InvocationDispatcher<C>> {
        &self.dispatcher
    }

    /// Runs a single request.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ShutDown`] after [`ActionExecutor::shutdown`].
    pub async fn invoke(&self, request: &InvocationRequest) -> ExecutorResult<InvocationResult> {
        if self.is_shut_down() {
            return Err(ExecutorError::ShutDown);
        }
        let dispatched = self.dispatcher.dispatch(request, &EventPayload::new()).await;
        self.record(&dispatched.result);
        Ok(dispatched.result)
    }

    /// Runs a batch to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ShutDown`] after [`ActionExecutor::shutdown`].
    pub async fn run(&self, batch: &ExecutionBatch) -> ExecutorResult<BatchOutcome> {
        self.run_with_cancellation(batch, &CancellationToken::new())
            .await
    }

    /// Runs a batch, starting no new invocations once `cancel` fires.
    ///
    /// In-flight invocations complete; never-started requests are reported
    /// as cancelled and the batch status is `aborted`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ShutDown`] after [`ActionExecutor::shutdown`].
    pub async fn run_with_cancellation(
        &self,
        batch: &ExecutionBatch,
        cancel: &CancellationToken,
    ) -> ExecutorResult<BatchOutcome> {
        if self.is_shut_down() {
            return Err(ExecutorError::ShutDown);
        }

        let started = Instant::now();
        let context = EventPayload::new().with_batch(batch.id());
        self.dispatcher.events().emit(
            EventKind::BatchStarted,
            context
                .clone()
                .with_data("mode", json!(batch.mode().as_str()))
                .with_data("rollback", json!(batch.rollback().as_str()))
                .with_data("size", json!(batch.len())),
        );

        let mut run = BatchRun::new(batch.requests());
        match batch.mode() {
            ExecutionMode::Sequential => {
                self.run_sequential(batch, &mut run, &context, cancel).await;
            }
            ExecutionMode::Concurrent => {
                self.run_concurrent(batch, &mut run, &context, cancel).await;
            }
        }

        let rollbacks = self.roll_back(batch, &run, &context).await;
        let status = batch_status(batch.rollback(), &run, &rollbacks);
        let entries = run.into_entries();

        let not_started = entries
            .iter()
            .filter(|entry| entry.result().is_none())
            .count();
        self.counters.batches.fetch_add(1, Ordering::Relaxed);
        self.counters
            .not_started
            .fetch_add(u64::try_from(not_started).unwrap_or(u64::MAX), Ordering::Relaxed);

        self.dispatcher.events().emit(
            EventKind::BatchCompleted,
            context
                .with_message(status.as_str())
                .with_data("status", json!(status.as_str())),
        );
        tracing::debug!(batch_id = %batch.id(), %status, "batch finished");

        Ok(BatchOutcome {
            batch_id: batch.id(),
            status,
            entries,
            rollbacks,
            duration: started.elapsed(),
        })
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn statistics(&self) -> ExecutionStatistics {
        self.counters.snapshot()
    }

    /// Resets all counters.
    pub fn reset_statistics(&self) {
        self.counters.reset();
    }

    /// Returns finished invocations, most recent first, up to `limit`.
    #[must_use]
    pub fn history(&self, limit: Option<usize>) -> Vec<ExecutionRecord> {
        self.log.recent(limit)
    }

    /// Empties the execution log; counters are left untouched.
    pub fn clear_history(&self) {
        self.log.clear();
    }

    /// Refuses new runs; running batches stop starting invocations.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns whether [`ActionExecutor::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Returns a token cancelled when the executor shuts down.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn run_sequential(
        &self,
        batch: &ExecutionBatch,
        run: &mut BatchRun<'_>,
        context: &EventPayload,
        cancel: &CancellationToken,
    ) {
        let halt_on_failure = batch.rollback() == RollbackPolicy::AllOrNothing;
        for (index, request) in batch.requests().iter().enumerate() {
            if self.halted(cancel) {
                run.skip(index, NotStartedReason::Cancelled);
                continue;
            }
            if halt_on_failure && run.has_failures() {
                run.skip(index, NotStartedReason::HaltedAfterFailure);
                continue;
            }

            let dispatched = self.dispatcher.dispatch(request, context).await;
            self.record(&dispatched.result);
            run.complete(index, dispatched);
        }
    }

    async fn run_concurrent(
        &self,
        batch: &ExecutionBatch,
        run: &mut BatchRun<'_>,
        context: &EventPayload,
        cancel: &CancellationToken,
    ) {
        let bound = batch
            .max_in_flight()
            .map_or(self.dispatcher.config().max_in_flight, usize::from)
            .max(1);
        let halt_on_failure = batch.rollback() == RollbackPolicy::AllOrNothing;
        let mut pending = batch.requests().iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut exhausted = false;

        loop {
            while !exhausted && in_flight.len() < bound {
                if self.halted(cancel) || (halt_on_failure && run.has_failures()) {
                    break;
                }
                let Some((index, request)) = pending.next() else {
                    exhausted = true;
                    break;
                };
                let dispatcher = &self.dispatcher;
                in_flight.push(async move {
                    let dispatched = dispatcher.dispatch(request, context).await;
                    (index, dispatched)
                });
            }

            let Some((index, dispatched)) = in_flight.next().await else {
                break;
            };
            self.record(&dispatched.result);
            run.complete(index, dispatched);
        }

        let reason = if self.halted(cancel) {
            NotStartedReason::Cancelled
        } else {
            NotStartedReason::HaltedAfterFailure
        };
        for (index, _) in pending {
            run.skip(index, reason);
        }
    }

    async fn roll_back(
        &self,
        batch: &ExecutionBatch,
        run: &BatchRun<'_>,
        context: &EventPayload,
    ) -> Vec<RollbackRecord> {
        let targets: Vec<usize> = match batch.rollback() {
            RollbackPolicy::None => Vec::new(),
            RollbackPolicy::BestEffort => run
                .failed
                .iter()
                .copied()
                .filter(|index| {
                    run.instances
                        .get(*index)
                        .and_then(Option::as_ref)
                        .is_some_and(|instance| instance.supports_rollback())
                })
                .collect(),
            RollbackPolicy::AllOrNothing if run.has_failures() || run.cancelled => {
                run.completion_order.iter().rev().copied().collect()
            }
            RollbackPolicy::AllOrNothing => Vec::new(),
        };

        let mut records = Vec::with_capacity(targets.len());
        for index in targets {
            let (Some(request), Some(Some(instance))) =
                (batch.requests().get(index), run.instances.get(index))
            else {
                continue;
            };
            let record = self.dispatcher.rollback(instance, request, context).await;
            self.counters.record_rollback(&record);
            records.push(record);
        }
        records
    }

    fn record(&self, result: &InvocationResult) {
        self.counters.record_result(result);
        self.log.push(result);
    }

    fn halted(&self, cancel: &CancellationToken) -> bool {
        cancel.is_cancelled() || self.shutdown.is_cancelled()
    }
}

fn batch_status(
    policy: RollbackPolicy,
    run: &BatchRun<'_>,
    rollbacks: &[RollbackRecord],
) -> BatchStatus {
    let rollback_incomplete = rollbacks.iter().any(|record| !record.is_rolled_back());
    if policy == RollbackPolicy::AllOrNothing && rollback_incomplete {
        return BatchStatus::Degraded;
    }
    if run.cancelled {
        return BatchStatus::Aborted;
    }
    if run.has_failures() {
        return BatchStatus::Failed;
    }
    BatchStatus::Succeeded
}
