//! Adapter implementations of registry ports.

mod static_locator;

pub use static_locator::StaticPluginLocator;
