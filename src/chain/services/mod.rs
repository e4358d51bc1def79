//! Chain orchestration services.

mod executor;

pub use executor::{ChainError, ChainExecutor, ChainResult};
