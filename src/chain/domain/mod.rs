//! Chain domain: definitions, bindings, predicates and run records.

mod context;
mod definition;
mod error;
mod predicate;
mod run;
mod step;

pub use context::{ChainContext, StepStatus};
pub use definition::{ChainBuilder, ChainDefinition, FailurePolicy};
pub use error::{ChainDefinitionError, ChainDefinitionResult};
pub use predicate::StepPredicate;
pub use run::{ChainInput, ChainRun, ChainRunState, ChainStatus, StepRecord};
pub use step::{BindingResolution, ChainStep, FieldPath, ParameterBinding, StepId};
