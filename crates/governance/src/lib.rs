//! `bitflow-governance` — request-time governance policy engine.
//!
//! This crate is decoupled from HTTP and storage: the dispatch layer supplies
//! an [`Actor`], a [`RequestContext`] and the operation's [`Requirement`];
//! persistence sits behind [`CapabilityStore`] and [`AuditLog`].

pub mod actor;
pub mod audit;
pub mod claims;
pub mod evaluator;
pub mod permissions;
pub mod request;
pub mod requirement;
pub mod roles;
pub mod store;
pub mod violation;

#[cfg(test)]
mod testing;

pub use actor::Actor;
pub use audit::{AuditLog, AuditSink, Pagination, ViolationFilter, ViolationPage, ViolationQuery};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use evaluator::{Decision, EvaluationError, GovernanceError, PolicyEvaluator};
pub use permissions::{Capability, FacultyPermissionSet};
pub use request::RequestContext;
pub use requirement::{OperationId, Requirement, RouteTable, RouteTableError};
pub use roles::Role;
pub use store::{AssignmentStatus, CapabilityStore, Department, FacultyAssignment, StoreError};
pub use violation::{NewViolation, ViolationKind, ViolationRecord};
