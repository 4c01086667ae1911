//! Security-violation audit trail.
//!
//! [`AuditLog`] is the append-only persistence seam. [`AuditSink`] is what the
//! evaluator talks to: it stamps records, writes them to the primary log and,
//! when that fails, raises a security alert and falls back to a dead-letter
//! log. The sink never returns an error to its caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bitflow_core::{CollegeId, UserId};

use crate::store::StoreError;
use crate::violation::{NewViolation, ViolationKind, ViolationRecord};

/// Tracing target for events that must reach an operator.
pub const SECURITY_ALERT_TARGET: &str = "bitflow::security_alert";

/// Append-only violation storage. There is no update or delete.
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        (**self).append(record).await
    }
}

/// Pagination parameters for violation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    pub const MAX_LIMIT: u64 = 500;
    /// Largest offset a SQL `OFFSET` accepts.
    pub const MAX_OFFSET: u64 = i64::MAX as u64;

    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset: offset.min(Self::MAX_OFFSET),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Whether `total` matching rows extend past this page.
    pub fn has_more(&self, total: u64) -> bool {
        total > self.offset.saturating_add(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

/// Filter for violation reports. All fields are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationFilter {
    pub college_id: Option<CollegeId>,
    pub actor_id: Option<UserId>,
    pub kind: Option<ViolationKind>,
    pub recorded_after: Option<DateTime<Utc>>,
    pub recorded_before: Option<DateTime<Utc>>,
}

impl ViolationFilter {
    pub fn for_college(college_id: CollegeId) -> Self {
        Self {
            college_id: Some(college_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &ViolationRecord) -> bool {
        self.college_id.is_none_or(|c| record.college_id == Some(c))
            && self.actor_id.is_none_or(|a| record.actor_id == a)
            && self.kind.is_none_or(|k| record.kind == k)
            && self.recorded_after.is_none_or(|t| record.recorded_at >= t)
            && self.recorded_before.is_none_or(|t| record.recorded_at < t)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationPage {
    /// Newest first.
    pub violations: Vec<ViolationRecord>,
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Read side of the audit trail, for reporting only.
///
/// Nothing on the authorization path reads through this trait.
#[async_trait::async_trait]
pub trait ViolationQuery: Send + Sync {
    async fn list_violations(
        &self,
        filter: ViolationFilter,
        pagination: Pagination,
    ) -> Result<ViolationPage, StoreError>;

    async fn count_by_kind(
        &self,
        college_id: CollegeId,
    ) -> Result<HashMap<ViolationKind, u64>, StoreError>;
}

/// The evaluator-facing audit sink.
pub struct AuditSink {
    primary: Arc<dyn AuditLog>,
    fallback: Arc<dyn AuditLog>,
    escalations: AtomicU64,
}

impl AuditSink {
    pub fn new(primary: Arc<dyn AuditLog>, fallback: Arc<dyn AuditLog>) -> Self {
        Self {
            primary,
            fallback,
            escalations: AtomicU64::new(0),
        }
    }

    /// Stamp and persist a violation. Never fails; failures escalate instead.
    pub async fn append(&self, violation: NewViolation) -> ViolationRecord {
        let record = violation.stamp(Utc::now());

        match self.primary.append(&record).await {
            Ok(()) => {
                tracing::debug!(violation_id = %record.id, kind = %record.kind, "violation recorded");
            }
            Err(primary_err) => {
                self.escalations.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    target: SECURITY_ALERT_TARGET,
                    violation_id = %record.id,
                    kind = %record.kind,
                    actor_id = %record.actor_id,
                    error = %primary_err,
                    "audit log append failed; writing violation to dead-letter log"
                );

                if let Err(fallback_err) = self.fallback.append(&record).await {
                    let evidence = serde_json::to_string(&record)
                        .unwrap_or_else(|e| format!("unserializable violation {}: {e}", record.id));
                    tracing::error!(
                        target: SECURITY_ALERT_TARGET,
                        violation_id = %record.id,
                        error = %fallback_err,
                        record = %evidence,
                        "dead-letter append failed; violation preserved in process log only"
                    );
                }
            }
        }

        record
    }

    /// Number of appends that missed the primary log since startup.
    pub fn escalations(&self) -> u64 {
        self.escalations.load(Ordering::Relaxed)
    }
}

impl core::fmt::Debug for AuditSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditSink")
            .field("escalations", &self.escalations())
            .finish_non_exhaustive()
    }
}
