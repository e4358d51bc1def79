//! Unit tests for the capability registry.

mod support;
