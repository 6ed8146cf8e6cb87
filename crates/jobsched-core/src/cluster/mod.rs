//! Cluster cache implementations.

mod memory;

pub use memory::MemoryClusterCache;
