//! Read-only capability lookups the evaluator depends on.
//!
//! Implementations live in `bitflow-infra` (in-memory for tests/dev, Postgres
//! for production). The engine never mutates these records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bitflow_core::{AssignmentId, CollegeId, DepartmentId, UserId};

use crate::FacultyPermissionSet;

/// A department of a college; at most one acting head at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub college_id: CollegeId,
    pub name: String,
    pub hod_id: Option<UserId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,
    Inactive,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "ACTIVE",
            AssignmentStatus::Inactive => "INACTIVE",
        }
    }
}

/// Links a faculty member to a department with a chosen permission set.
///
/// Unique per (user, department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyAssignment {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub college_id: CollegeId,
    pub status: AssignmentStatus,
    pub subjects: Vec<String>,
    pub permission: Option<FacultyPermissionSet>,
}

impl FacultyAssignment {
    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }
}

/// Persistence failure while reading capabilities or writing the audit trail.
///
/// Never converted into an allow/deny decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store timed out: {0}")]
    Timeout(String),

    #[error("store query failed: {0}")]
    Query(String),
}

/// Keyed, uncached lookups against the persistence layer.
#[async_trait::async_trait]
pub trait CapabilityStore: Send + Sync {
    async fn department_by_id(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;

    /// The department whose acting head is `hod_id`, if any.
    async fn department_by_hod(&self, hod_id: UserId) -> Result<Option<Department>, StoreError>;

    /// The unique assignment for (user, department) with its linked permission set.
    async fn faculty_assignment(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<FacultyAssignment>, StoreError>;
}

#[async_trait::async_trait]
impl<S> CapabilityStore for Arc<S>
where
    S: CapabilityStore + ?Sized,
{
    async fn department_by_id(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        (**self).department_by_id(id).await
    }

    async fn department_by_hod(&self, hod_id: UserId) -> Result<Option<Department>, StoreError> {
        (**self).department_by_hod(hod_id).await
    }

    async fn faculty_assignment(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<FacultyAssignment>, StoreError> {
        (**self).faculty_assignment(user_id, department_id).await
    }
}
