//! `bitflow-core` — shared domain primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AssignmentId, CollegeId, DepartmentId, PermissionSetId, PublisherId, UserId, ViolationId};
