use std::collections::HashMap;
use std::sync::RwLock;

use bitflow_core::CollegeId;
use bitflow_governance::{
    AuditLog, Pagination, StoreError, ViolationFilter, ViolationKind, ViolationPage, ViolationQuery,
    ViolationRecord,
};

/// Append-only in-memory violation log.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<ViolationRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot in append order.
    pub fn records(&self) -> Vec<ViolationRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ViolationQuery for InMemoryAuditLog {
    async fn list_violations(
        &self,
        filter: ViolationFilter,
        pagination: Pagination,
    ) -> Result<ViolationPage, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let matching: Vec<&ViolationRecord> = records.iter().rev().filter(|r| filter.matches(r)).collect();
        let total = matching.len() as u64;
        let violations = matching
            .into_iter()
            .skip(usize::try_from(pagination.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(pagination.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(ViolationPage {
            violations,
            total,
            pagination,
            has_more: pagination.has_more(total),
        })
    }

    async fn count_by_kind(
        &self,
        college_id: CollegeId,
    ) -> Result<HashMap<ViolationKind, u64>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut counts = HashMap::new();
        for record in records.iter().filter(|r| r.college_id == Some(college_id)) {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
