//! Registry domain: entry states, listing snapshots and discovery reports.

mod discovery;
mod entry;

pub use discovery::{DiscoveryFailure, DiscoveryReport};
pub use entry::{EntryState, ParseEntryStateError, RegisteredAbility};
