//! Target-writer boundary for projected documents.

pub mod base;
pub mod memory;

pub use base::Destination;
pub use memory::MemoryDestination;
