//! Adapter implementations of the ability port.

mod function;

pub use function::FunctionAbility;
