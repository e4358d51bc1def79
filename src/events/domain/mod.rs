//! Event domain: typed tags, payloads and handler failures.

mod error;
mod event;

pub use error::{HandlerError, ParseEventKindError};
pub use event::{Event, EventKind, EventPayload};
