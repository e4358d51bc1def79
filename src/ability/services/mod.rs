//! Ability execution services.

mod instance;

pub use instance::{AbilityInstance, InvocationFailure, LifecycleError};
