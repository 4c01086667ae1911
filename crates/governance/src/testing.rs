//! In-crate fakes for evaluator and sink tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bitflow_core::{DepartmentId, UserId};

use crate::audit::AuditLog;
use crate::store::{CapabilityStore, Department, FacultyAssignment, StoreError};
use crate::violation::ViolationRecord;

#[derive(Debug, Default)]
pub struct RecordingAuditLog {
    records: Mutex<Vec<ViolationRecord>>,
}

impl RecordingAuditLog {
    pub fn records(&self) -> Vec<ViolationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuditLog for RecordingAuditLog {
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FailingAuditLog;

#[async_trait::async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _record: &ViolationRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("audit table offline".into()))
    }
}

#[derive(Debug, Default)]
pub struct FakeStore {
    departments: Mutex<HashMap<DepartmentId, Department>>,
    assignments: Mutex<HashMap<(UserId, DepartmentId), FacultyAssignment>>,
    offline: AtomicBool,
    lookups: AtomicUsize,
}

impl FakeStore {
    pub fn with_department(self, department: Department) -> Self {
        self.departments.lock().unwrap().insert(department.id, department);
        self
    }

    pub fn with_assignment(self, assignment: FacultyAssignment) -> Self {
        self.assignments
            .lock()
            .unwrap()
            .insert((assignment.user_id, assignment.department_id), assignment);
        self
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn touch(&self) -> Result<(), StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout("query exceeded statement timeout".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CapabilityStore for FakeStore {
    async fn department_by_id(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        self.touch()?;
        Ok(self.departments.lock().unwrap().get(&id).cloned())
    }

    async fn department_by_hod(&self, hod_id: UserId) -> Result<Option<Department>, StoreError> {
        self.touch()?;
        Ok(self
            .departments
            .lock()
            .unwrap()
            .values()
            .find(|d| d.hod_id == Some(hod_id))
            .cloned())
    }

    async fn faculty_assignment(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<FacultyAssignment>, StoreError> {
        self.touch()?;
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .get(&(user_id, department_id))
            .cloned())
    }
}
