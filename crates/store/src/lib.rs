//! Record store implementations for FieldRep.

pub mod in_memory;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use seed::{SeedReport, seed_if_empty};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
