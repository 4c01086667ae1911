use std::collections::HashMap;
use std::sync::RwLock;

use bitflow_core::{AssignmentId, CollegeId, DepartmentId, PermissionSetId, UserId};
use bitflow_governance::{
    AssignmentStatus, CapabilityStore, Department, FacultyAssignment, FacultyPermissionSet, StoreError,
};

/// Seed for a faculty assignment; the permission set is linked by id.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub college_id: CollegeId,
    pub status: AssignmentStatus,
    pub subjects: Vec<String>,
    pub permission_id: Option<PermissionSetId>,
}

impl NewAssignment {
    pub fn active(department: &Department, user_id: UserId, permission_id: Option<PermissionSetId>) -> Self {
        Self {
            user_id,
            department_id: department.id,
            college_id: department.college_id,
            status: AssignmentStatus::Active,
            subjects: Vec::new(),
            permission_id,
        }
    }
}

#[derive(Debug, Clone)]
struct AssignmentRow {
    id: AssignmentId,
    seed: NewAssignment,
}

#[derive(Debug, Default)]
struct Tables {
    departments: HashMap<DepartmentId, Department>,
    permission_sets: HashMap<PermissionSetId, FacultyPermissionSet>,
    assignments: HashMap<(UserId, DepartmentId), AssignmentRow>,
}

/// In-memory capability store for tests/dev.
///
/// Assignments reference permission sets by id, so editing a set is visible
/// through every assignment linked to it.
#[derive(Debug, Default)]
pub struct InMemoryCapabilityStore {
    inner: RwLock<Tables>,
}

impl InMemoryCapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_department(&self, department: Department) {
        if let Ok(mut t) = self.inner.write() {
            t.departments.insert(department.id, department);
        }
    }

    /// Store a permission set, assigning an id if it has none.
    pub fn upsert_permission_set(&self, mut set: FacultyPermissionSet) -> PermissionSetId {
        let id = *set.id.get_or_insert_with(PermissionSetId::new);
        if let Ok(mut t) = self.inner.write() {
            t.permission_sets.insert(id, set);
        }
        id
    }

    /// Create or replace the assignment for (user, department).
    pub fn upsert_assignment(&self, seed: NewAssignment) -> AssignmentId {
        let key = (seed.user_id, seed.department_id);
        let Ok(mut t) = self.inner.write() else {
            return AssignmentId::new();
        };
        let id = t.assignments.get(&key).map(|row| row.id).unwrap_or_else(AssignmentId::new);
        t.assignments.insert(key, AssignmentRow { id, seed });
        id
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl CapabilityStore for InMemoryCapabilityStore {
    async fn department_by_id(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.read()?.departments.get(&id).cloned())
    }

    async fn department_by_hod(&self, hod_id: UserId) -> Result<Option<Department>, StoreError> {
        Ok(self
            .read()?
            .departments
            .values()
            .find(|d| d.hod_id == Some(hod_id))
            .cloned())
    }

    async fn faculty_assignment(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<FacultyAssignment>, StoreError> {
        let t = self.read()?;
        let Some(row) = t.assignments.get(&(user_id, department_id)) else {
            return Ok(None);
        };

        let permission = row
            .seed
            .permission_id
            .and_then(|pid| t.permission_sets.get(&pid).cloned());

        Ok(Some(FacultyAssignment {
            id: row.id,
            user_id: row.seed.user_id,
            department_id: row.seed.department_id,
            college_id: row.seed.college_id,
            status: row.seed.status,
            subjects: row.seed.subjects.clone(),
            permission,
        }))
    }
}
