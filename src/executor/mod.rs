//! Action executor: runs batches of invocations.
//!
//! Batches run sequentially or concurrently under a bounded in-flight
//! count, with a rollback policy deciding how completed work is
//! compensated when part of the batch fails. Results always come back
//! complete and in submission order.
//!
//! - Domain types in [`domain`]
//! - The dispatcher and executor in [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
