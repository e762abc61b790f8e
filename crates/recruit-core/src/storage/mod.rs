//! Unit-of-work implementations.

mod memory;

pub use memory::MemoryStore;
