//! Event bus services.

mod bus;

pub use bus::{
    BusStatistics, EventBus, EventBusError, EventBusResult, EventFilter, EventHandler,
    EventPredicate, SubscriptionId,
};
