//! Publish/subscribe event bus with bounded history.

use crate::config::EventBusConfig;
use crate::events::domain::{Event, EventKind, EventPayload, HandlerError};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Synchronous event handler.
pub type EventHandler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Predicate over a full event.
pub type EventPredicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Selects which events a subscription receives.
#[derive(Clone)]
pub enum EventFilter {
    /// Every event.
    All,
    /// Events with exactly this tag.
    Kind(EventKind),
    /// Events accepted by the predicate.
    Predicate(EventPredicate),
}

impl EventFilter {
    /// Builds a predicate filter from a closure.
    #[must_use]
    pub fn predicate(predicate: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    /// Returns whether `event` passes the filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => event.kind() == *kind,
            Self::Predicate(predicate) => predicate(event),
        }
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Counters maintained by the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatistics {
    /// Events published, diagnostics included.
    pub published: u64,
    /// Successful handler deliveries.
    pub delivered: u64,
    /// Handler calls that returned an error or panicked.
    pub handler_failures: u64,
}

/// Errors raised by subscription management.
#[derive(Debug, Clone, Error)]
pub enum EventBusError {
    /// The bus has been closed.
    #[error("event bus is closed")]
    Closed,

    /// Internal state lock was poisoned.
    #[error("event bus state unavailable: {0}")]
    Lock(Arc<dyn std::error::Error + Send + Sync>),
}

impl EventBusError {
    /// Wraps a lock failure.
    #[must_use]
    pub fn lock(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lock(Arc::new(err))
    }
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

struct Subscription {
    id: SubscriptionId,
    filter: EventFilter,
    handler: EventHandler,
}

#[derive(Default)]
struct Subscribers {
    entries: Vec<Subscription>,
    closed: bool,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    handler_failures: AtomicU64,
}

/// Process-scoped publish/subscribe channel.
///
/// Publishing never fails: handler errors and panics, and panics raised by
/// predicate filters, are caught and reported as
/// [`EventKind::SubscriberFailed`] diagnostics. Handlers run
/// synchronously on the publishing thread, in unspecified order, and must
/// not block.
pub struct EventBus<C>
where
    C: Clock + Send + Sync,
{
    subscribers: RwLock<Subscribers>,
    history: Mutex<VecDeque<Event>>,
    history_capacity: usize,
    counters: Counters,
    next_id: AtomicU64,
    clock: Arc<C>,
}

impl<C> fmt::Debug for EventBus<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("history_capacity", &self.history_capacity)
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl<C> EventBus<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an open bus with no subscribers.
    #[must_use]
    pub fn new(config: &EventBusConfig, clock: Arc<C>) -> Self {
        Self {
            subscribers: RwLock::new(Subscribers::default()),
            history: Mutex::new(VecDeque::with_capacity(config.history_capacity)),
            history_capacity: config.history_capacity,
            counters: Counters::default(),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    /// Returns the clock used to stamp events.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Registers a handler for events passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Closed`] after [`EventBus::close`] and
    /// [`EventBusError::Lock`] when internal state is poisoned.
    pub fn subscribe(
        &self,
        filter: EventFilter,
        handler: impl Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> EventBusResult<SubscriptionId> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|err| EventBusError::lock(std::io::Error::other(err.to_string())))?;
        if subscribers.closed {
            return Err(EventBusError::Closed);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.entries.push(Subscription {
            id,
            filter,
            handler: Arc::new(handler),
        });
        tracing::debug!(subscription = %id, "event subscriber added");
        Ok(id)
    }

    /// Registers a handler for one event tag.
    ///
    /// # Errors
    ///
    /// See [`EventBus::subscribe`].
    pub fn subscribe_kind(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> EventBusResult<SubscriptionId> {
        self.subscribe(EventFilter::Kind(kind), handler)
    }

    /// Registers a handler for every event.
    ///
    /// # Errors
    ///
    /// See [`EventBus::subscribe`].
    pub fn subscribe_all(
        &self,
        handler: impl Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> EventBusResult<SubscriptionId> {
        self.subscribe(EventFilter::All, handler)
    }

    /// Removes a subscription; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Lock`] when internal state is poisoned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> EventBusResult<bool> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|err| EventBusError::lock(std::io::Error::other(err.to_string())))?;
        let before = subscribers.entries.len();
        subscribers.entries.retain(|subscription| subscription.id != id);
        Ok(subscribers.entries.len() != before)
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Builds an event stamped with the bus clock and publishes it.
    pub fn emit(&self, kind: EventKind, payload: EventPayload) {
        self.publish(Event::new(kind, payload, self.clock.as_ref()));
    }

    /// Records `event` in history and dispatches it to matching subscribers.
    pub fn publish(&self, event: Event) {
        let handlers = {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if subscribers.closed {
                tracing::debug!(kind = %event.kind(), "event dropped by closed bus");
                return;
            }
            subscribers
                .entries
                .iter()
                .map(|subscription| {
                    (
                        subscription.id,
                        subscription.filter.clone(),
                        Arc::clone(&subscription.handler),
                    )
                })
                .collect::<Vec<_>>()
        };

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        self.record(&event);

        for (id, filter, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| filter.matches(&event))) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(panic) => {
                    let reason = panic_message("filter", panic.as_ref());
                    self.report_failure(id, &event, &reason);
                    continue;
                }
            }
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(err)) => self.report_failure(id, &event, &err.to_string()),
                Err(panic) => {
                    let reason = panic_message("handler", panic.as_ref());
                    self.report_failure(id, &event, &reason);
                }
            }
        }
    }

    /// Publishes events in order.
    pub fn publish_many(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Returns retained events, most recent first.
    ///
    /// `kind` restricts the result to one tag; `limit` caps its length.
    #[must_use]
    pub fn history(&self, kind: Option<EventKind>, limit: Option<usize>) -> Vec<Event> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .iter()
            .rev()
            .filter(|event| kind.is_none_or(|wanted| event.kind() == wanted))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Drops all retained events.
    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns a snapshot of the bus counters.
    #[must_use]
    pub fn statistics(&self) -> BusStatistics {
        BusStatistics {
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_statistics(&self) {
        self.counters.published.store(0, Ordering::Relaxed);
        self.counters.delivered.store(0, Ordering::Relaxed);
        self.counters.handler_failures.store(0, Ordering::Relaxed);
    }

    /// Drops every subscription and stops accepting new ones.
    ///
    /// Events published afterwards are discarded.
    pub fn close(&self) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.entries.clear();
        subscribers.closed = true;
        tracing::debug!("event bus closed");
    }

    /// Returns whether [`EventBus::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    fn record(&self, event: &Event) {
        if self.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(event.clone());
    }

    fn report_failure(&self, id: SubscriptionId, event: &Event, reason: &str) {
        self.counters
            .handler_failures
            .fetch_add(1, Ordering::Relaxed);

        if event.kind().is_diagnostic() {
            tracing::error!(
                subscription = %id,
                kind = %event.kind(),
                reason,
                "subscriber failed while handling a diagnostic event"
            );
            return;
        }

        let payload = EventPayload::new()
            .with_message(reason)
            .with_data("subscription", json!(id.value()))
            .with_data("event_id", json!(event.id().to_string()))
            .with_data("event_kind", json!(event.kind().as_str()));
        self.emit(EventKind::SubscriberFailed, payload);
    }
}

fn panic_message(origin: &str, panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        return format!("{origin} panicked: {text}");
    }
    if let Some(text) = panic.downcast_ref::<String>() {
        return format!("{origin} panicked: {text}");
    }
    format!("{origin} panicked")
}
