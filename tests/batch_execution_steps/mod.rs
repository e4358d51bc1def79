//! Step definitions for batch execution scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
