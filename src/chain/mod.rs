//! Chain executor: ordered pipelines of invocations.
//!
//! Each step's parameters are bound to static values, chain input, or the
//! result data of an earlier step, and resolved immediately before the step
//! runs. Predicates can skip steps; skipped and failed steps are seen
//! downstream as explicitly absent, never defaulted.
//!
//! - Definitions, bindings and run records in [`domain`]
//! - The executor in [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
