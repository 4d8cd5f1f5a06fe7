pub mod memory;
pub mod vespa;

pub use memory::MemoryStore;
pub use vespa::VespaStore;
