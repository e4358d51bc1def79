//! Plugin locator port consumed by discovery.

use crate::ability::domain::{AbilityDescriptor, Parameters};
use crate::registry::ports::AbilityFactory;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// One (descriptor, constructor, metadata) triple produced by a locator.
#[derive(Clone)]
pub struct PluginCandidate {
    /// Declared descriptor.
    pub descriptor: AbilityDescriptor,
    /// Constructor for the implementation.
    pub factory: Arc<dyn AbilityFactory>,
    /// Free-form plugin metadata.
    pub metadata: Parameters,
}

impl PluginCandidate {
    /// Creates a candidate with empty metadata.
    #[must_use]
    pub fn new(descriptor: AbilityDescriptor, factory: Arc<dyn AbilityFactory>) -> Self {
        Self {
            descriptor,
            factory,
            metadata: Parameters::new(),
        }
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Parameters) -> Self {
        self.metadata = metadata;
        self
    }
}

impl fmt::Debug for PluginCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCandidate")
            .field("ability", self.descriptor.name())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Failure reported by a plugin locator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// Enumeration as a whole failed.
    #[error("plugin enumeration failed: {0}")]
    Enumeration(String),

    /// A single entry could not be read.
    #[error("malformed plugin entry {entry}: {reason}")]
    MalformedEntry {
        /// Entry identifier as known to the locator.
        entry: String,
        /// Why the entry was rejected.
        reason: String,
    },
}

/// Result type for locator operations.
pub type LocatorResult<T> = Result<T, LocatorError>;

/// External source of candidate abilities.
///
/// Implementations produce a finite list; calling `locate` again restarts
/// enumeration.
pub trait PluginLocator: Send + Sync {
    /// Enumerates candidates.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError`] when enumeration itself fails. Individual
    /// malformed entries are reported inline.
    fn locate(&self) -> LocatorResult<Vec<LocatorResult<PluginCandidate>>>;
}
