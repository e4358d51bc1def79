//! Ability engine: discovery, dispatch and orchestration of pluggable
//! units of work.
//!
//! Abilities are registered in a capability registry, validated against
//! their own declared schema, and run one at a time, as sequential or
//! concurrent batches with rollback policies, or as multi-step chains whose
//! steps feed each other. Every phase is announced on an event bus that
//! observability collaborators subscribe to.
//!
//! # Architecture
//!
//! Each component follows hexagonal architecture principles:
//!
//! - **Domain**: Pure value types with no infrastructure dependencies
//! - **Ports**: Trait contracts for abilities, factories and plugin locators
//! - **Adapters**: Closure-backed abilities, a static locator, a logging sink
//! - **Services**: Registry, bus and executors that orchestrate the domain
//!
//! # Modules
//!
//! - [`ability`]: The ability contract, descriptors, requests and results
//! - [`registry`]: Name to implementation mapping with lazy singletons
//! - [`executor`]: Batch execution with bounded concurrency and rollback
//! - [`chain`]: Ordered pipelines with bindings and predicates
//! - [`events`]: Publish/subscribe bus with bounded history
//! - [`config`]: Serde-backed configuration
//! - [`engine`]: Facade wiring everything together

pub mod ability;
pub mod chain;
pub mod config;
pub mod engine;
pub mod events;
pub mod executor;
pub mod registry;

pub use engine::{AbilityEngine, EngineError, EngineResult};
