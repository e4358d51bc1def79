//! Discovery outcome reporting.

use crate::ability::domain::AbilityName;
use serde::{Deserialize, Serialize};

/// One candidate discovery could not register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryFailure {
    /// Candidate name when it was readable.
    pub ability: Option<AbilityName>,
    /// Why the candidate was skipped.
    pub reason: String,
}

/// Summary of a [`discover`](crate::registry::services::CapabilityRegistry::discover) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Names registered by this pass, in locator order.
    pub registered: Vec<AbilityName>,
    /// Candidates skipped, in locator order.
    pub failures: Vec<DiscoveryFailure>,
    /// Set when the locator could not enumerate at all.
    pub enumeration_error: Option<String>,
}

impl DiscoveryReport {
    /// Returns whether every candidate was registered and enumeration worked.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.enumeration_error.is_none()
    }
}
