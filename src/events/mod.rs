//! Event bus: decoupled announcements of lifecycle and outcome events.
//!
//! Executors and the registry publish [`domain::Event`]s; observability
//! collaborators subscribe. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The bus itself in [`services`]
//! - Subscribers bridging to logging in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
