//! Capability registry: discovery, registration and lazy instantiation.
//!
//! Registration validates descriptors eagerly so that execution-time
//! resolution never re-checks structure. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts (factories, plugin locators) in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The registry itself in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
