//! Audit log adapters.
//!
//! - [`InMemoryAuditLog`]: tests and single-process dev runs.
//! - [`PostgresAuditLog`]: the `security_violations` table (primary in production).
//! - [`FileDeadLetterLog`]: JSON-lines file the sink falls back to when the
//!   primary log rejects an append.

pub mod dead_letter;
pub mod in_memory;
pub mod postgres;

pub use dead_letter::{FileDeadLetterLog, ReplayReport};
pub use in_memory::InMemoryAuditLog;
pub use postgres::PostgresAuditLog;
