//! Constructor contract for lazily instantiated abilities.

use crate::ability::ports::{Ability, AbilityFault};
use std::sync::Arc;

/// Builds a fresh ability implementation.
///
/// The registry calls the factory at most once per cached singleton.
pub trait AbilityFactory: Send + Sync {
    /// Constructs the ability.
    ///
    /// # Errors
    ///
    /// Returns the constructor failure; the registry reports it as an
    /// instantiation error.
    fn create(&self) -> Result<Arc<dyn Ability>, AbilityFault>;
}

impl<F> AbilityFactory for F
where
    F: Fn() -> Result<Arc<dyn Ability>, AbilityFault> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn Ability>, AbilityFault> {
        self()
    }
}
