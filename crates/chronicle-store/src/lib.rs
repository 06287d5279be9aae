//! Chronicle Engine — session store adapters.

mod memory;

pub use memory::InMemorySessionStore;
