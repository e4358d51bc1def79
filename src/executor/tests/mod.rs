//! Unit tests for the action executor.

mod support;
