//! Event bus subscribers bridging to external sinks.

mod tracing_sink;

pub use tracing_sink::{SinkLevel, TracingEventSink};
