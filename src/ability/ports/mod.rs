//! Port contracts for abilities.

mod ability;

pub use ability::{Ability, AbilityFault, RollbackError};
