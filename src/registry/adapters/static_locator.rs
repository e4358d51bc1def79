//! In-memory plugin locator.

use crate::registry::ports::{LocatorError, LocatorResult, PluginCandidate, PluginLocator};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

/// Locator backed by a fixed, editable list of entries.
///
/// Useful for embedding and tests: entries may be well-formed candidates or
/// recorded malformations, and enumeration can be made to fail outright.
#[derive(Debug, Default)]
pub struct StaticPluginLocator {
    entries: RwLock<Vec<LocatorResult<PluginCandidate>>>,
    enumeration_error: RwLock<Option<String>>,
}

impl StaticPluginLocator {
    /// Creates an empty locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locator from well-formed candidates.
    #[must_use]
    pub fn with_candidates(candidates: impl IntoIterator<Item = PluginCandidate>) -> Self {
        Self {
            entries: RwLock::new(candidates.into_iter().map(Ok).collect()),
            enumeration_error: RwLock::new(None),
        }
    }

    /// Appends a candidate.
    pub fn push(&self, candidate: PluginCandidate) {
        self.write_entries().push(Ok(candidate));
    }

    /// Appends a malformed entry.
    pub fn push_malformed(&self, entry: impl Into<String>, reason: impl Into<String>) {
        self.write_entries().push(Err(LocatorError::MalformedEntry {
            entry: entry.into(),
            reason: reason.into(),
        }));
    }

    /// Makes subsequent enumerations fail with `reason`.
    pub fn fail_enumeration(&self, reason: impl Into<String>) {
        *self
            .enumeration_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<LocatorResult<PluginCandidate>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PluginLocator for StaticPluginLocator {
    fn locate(&self) -> LocatorResult<Vec<LocatorResult<PluginCandidate>>> {
        let failure = self
            .enumeration_error
            .read()
            .map_err(|err| LocatorError::Enumeration(err.to_string()))?
            .clone();
        if let Some(reason) = failure {
            return Err(LocatorError::Enumeration(reason));
        }

        let entries = self
            .entries
            .read()
            .map_err(|err| LocatorError::Enumeration(err.to_string()))?;
        Ok(entries.clone())
    }
}
