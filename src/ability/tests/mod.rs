//! Unit tests for the ability module.
