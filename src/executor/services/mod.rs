//! Executor services.

mod action;
mod dispatcher;

pub use action::{ActionExecutor, ExecutorError, ExecutorResult};
pub use dispatcher::{Dispatched, InvocationDispatcher};
