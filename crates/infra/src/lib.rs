//! Infrastructure layer: capability lookups and the violation audit trail.

pub mod audit_log;
pub mod capability_store;
pub mod db;

pub use audit_log::{FileDeadLetterLog, InMemoryAuditLog, PostgresAuditLog, ReplayReport};
pub use db::{PoolSettings, apply_schema, connect};
pub use capability_store::{InMemoryCapabilityStore, NewAssignment, PostgresCapabilityStore};
