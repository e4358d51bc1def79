//! Domain model for abilities and their invocations.
//!
//! The ability domain covers self-description (descriptor and parameter
//! schema), the request/result value objects that flow through the
//! executors, instance lifecycle and health. Execution itself lives in the
//! ports and services layers.

mod descriptor;
mod error;
mod health;
mod ids;
mod lifecycle;
mod outcome;
mod parameter;
mod request;
mod result;

pub use descriptor::AbilityDescriptor;
pub use error::{
    AbilityDomainError, DescriptorError, ParseAbilityStateError, ParseErrorKindError,
    ParseParameterTypeError, RequestViolation,
};
pub use health::{AbilityHealth, HealthStatus};
pub use ids::{AbilityName, RequestId};
pub use lifecycle::AbilityState;
pub use outcome::ActionOutcome;
pub use parameter::{ParameterSpec, ParameterType};
pub use request::{InvocationRequest, Parameters};
pub use result::{ErrorKind, InvocationError, InvocationResult};
