use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use bitflow_core::{CollegeId, PublisherId, UserId, ViolationId};

use crate::{Actor, RequestContext};

/// Classification of an authorization denial.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    CrossTenantAccessAttempt,
    DataIsolationBreachAttempt,
    RoleBoundaryViolation,
    PermissionDenied,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 4] = [
        ViolationKind::CrossTenantAccessAttempt,
        ViolationKind::DataIsolationBreachAttempt,
        ViolationKind::RoleBoundaryViolation,
        ViolationKind::PermissionDenied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::CrossTenantAccessAttempt => "CROSS_TENANT_ACCESS_ATTEMPT",
            ViolationKind::DataIsolationBreachAttempt => "DATA_ISOLATION_BREACH_ATTEMPT",
            ViolationKind::RoleBoundaryViolation => "ROLE_BOUNDARY_VIOLATION",
            ViolationKind::PermissionDenied => "PERMISSION_DENIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl core::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A violation as produced by the evaluator, before the sink stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewViolation {
    pub actor_id: UserId,
    pub college_id: Option<CollegeId>,
    pub publisher_id: Option<PublisherId>,
    pub kind: ViolationKind,
    pub description: String,
    pub request_path: String,
    pub request_method: String,
    pub request_params: JsonValue,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewViolation {
    pub fn from_request(
        actor: &Actor,
        request: &RequestContext,
        kind: ViolationKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor.id,
            college_id: actor.college_id,
            publisher_id: actor.publisher_id,
            kind,
            description: description.into(),
            request_path: request.path.clone(),
            request_method: request.method.clone(),
            request_params: request.sanitized_params(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
        }
    }

    /// Assign identity and write time.
    pub fn stamp(self, recorded_at: DateTime<Utc>) -> ViolationRecord {
        ViolationRecord {
            id: ViolationId::new(),
            actor_id: self.actor_id,
            college_id: self.college_id,
            publisher_id: self.publisher_id,
            kind: self.kind,
            description: self.description,
            request_path: self.request_path,
            request_method: self.request_method,
            request_params: self.request_params,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            recorded_at,
        }
    }
}

/// Immutable security-violation audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub id: ViolationId,
    pub actor_id: UserId,
    pub college_id: Option<CollegeId>,
    pub publisher_id: Option<PublisherId>,
    #[serde(rename = "violationType")]
    pub kind: ViolationKind,
    pub description: String,
    pub request_path: String,
    pub request_method: String,
    pub request_params: JsonValue,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
