//! Port contracts for the capability registry.

mod factory;
mod locator;

pub use factory::AbilityFactory;
pub use locator::{LocatorError, LocatorResult, PluginCandidate, PluginLocator};
