//! Destination storage for normalized records.

pub mod base;
pub mod memory;

pub use base::{Destination, provision_table};
pub use memory::MemoryDestination;
