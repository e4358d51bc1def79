//! Unit tests for the event bus.
