//! Abilities: pluggable units of work and their execution template.
//!
//! An ability describes itself with an [`domain::AbilityDescriptor`],
//! validates incoming [`domain::InvocationRequest`]s against it and runs its
//! action logic once initialised. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Lifecycle-guarded execution in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
