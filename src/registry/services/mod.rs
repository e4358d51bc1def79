//! Registry orchestration services.

mod registry;

pub use registry::{CapabilityRegistry, RegisterAbilityRequest, RegistryError, RegistryResult};
