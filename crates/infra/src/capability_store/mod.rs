//! Read-only capability lookups (departments, faculty assignments, permission sets).

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryCapabilityStore, NewAssignment};
pub use postgres::PostgresCapabilityStore;
