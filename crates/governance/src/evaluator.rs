//! Request-time governance policy evaluation.
//!
//! Checks run in a fixed order and the first denial wins:
//!
//! ```text
//! 1. tenant isolation     (requirement.require_tenant_isolation)
//! 2. department scope     (requirement.require_department_scope, COLLEGE_HOD only)
//! 3. faculty capability   (requirement.required_capability, FACULTY only)
//! 4. role exclusion       (requirement.roles_forbidden)
//! ```
//!
//! Every denial is appended to the audit sink exactly once before it is
//! returned. Store failures are neither allow nor deny: they surface as
//! [`EvaluationError::Store`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{Span, instrument};

use bitflow_core::{DepartmentId, DomainError};

use crate::audit::AuditSink;
use crate::store::{CapabilityStore, StoreError};
use crate::violation::{NewViolation, ViolationKind};
use crate::{Actor, Capability, RequestContext, Requirement, Role};

/// Tracing target for owner cross-tenant access (not a violation).
pub const OVERSIGHT_TARGET: &str = "bitflow::governance::oversight";

/// Outcome of a governance evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// `kind` and `detail` are for the audit trail only, never for the client.
    Deny { kind: ViolationKind, detail: String },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluation could not reach a decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Caller error: a faculty capability check with no department to check against.
    #[error("department context required to check capability '{0}'")]
    DepartmentContextRequired(Capability),

    /// Caller error: an addressed identifier could not be parsed.
    #[error("malformed request identifier: {0}")]
    MalformedIdentifier(#[from] DomainError),

    /// Infrastructure error during a lookup.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the dispatch layer surfaces to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// Uniform denial; carries no hint of which rule fired.
    #[error("access denied")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EvaluationError> for GovernanceError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::DepartmentContextRequired(_) | EvaluationError::MalformedIdentifier(_) => {
                GovernanceError::BadRequest(err.to_string())
            }
            EvaluationError::Store(e) => GovernanceError::Internal(e.to_string()),
        }
    }
}

struct Denial {
    kind: ViolationKind,
    detail: String,
}

impl Denial {
    fn new(kind: ViolationKind, detail: impl Into<String>) -> Option<Self> {
        Some(Self {
            kind,
            detail: detail.into(),
        })
    }
}

/// Stateless, request-scoped governance evaluator.
pub struct PolicyEvaluator<S> {
    store: S,
    sink: Arc<AuditSink>,
}

impl<S> PolicyEvaluator<S>
where
    S: CapabilityStore,
{
    pub fn new(store: S, sink: Arc<AuditSink>) -> Self {
        Self { store, sink }
    }

    pub fn sink(&self) -> &AuditSink {
        &self.sink
    }

    /// Evaluate `requirement` for `actor` against `request`.
    ///
    /// An absent actor (anonymous route) or an absent/empty requirement is
    /// allowed without any lookup.
    #[instrument(
        name = "governance.evaluate",
        skip_all,
        fields(
            method = %request.method,
            path = %request.path,
            actor_id = tracing::field::Empty,
            role = tracing::field::Empty,
        )
    )]
    pub async fn evaluate(
        &self,
        actor: Option<&Actor>,
        request: &RequestContext,
        requirement: Option<&Requirement>,
    ) -> Result<Decision, EvaluationError> {
        let Some(actor) = actor else {
            return Ok(Decision::Allow);
        };
        let Some(requirement) = requirement.filter(|r| !r.is_empty()) else {
            return Ok(Decision::Allow);
        };

        let span = Span::current();
        span.record("actor_id", tracing::field::display(actor.id));
        span.record("role", actor.role.as_str());

        let Some(denial) = self.first_denial(actor, request, requirement).await? else {
            return Ok(Decision::Allow);
        };

        tracing::warn!(kind = %denial.kind, detail = %denial.detail, "governance check denied request");
        self.sink
            .append(NewViolation::from_request(
                actor,
                request,
                denial.kind,
                denial.detail.clone(),
            ))
            .await;

        Ok(Decision::Deny {
            kind: denial.kind,
            detail: denial.detail,
        })
    }

    /// [`evaluate`](Self::evaluate) mapped to the client-facing error model.
    pub async fn enforce(
        &self,
        actor: Option<&Actor>,
        request: &RequestContext,
        requirement: Option<&Requirement>,
    ) -> Result<(), GovernanceError> {
        match self.evaluate(actor, request, requirement).await {
            Ok(Decision::Allow) => Ok(()),
            Ok(Decision::Deny { .. }) => Err(GovernanceError::Forbidden),
            Err(EvaluationError::Store(e)) => {
                tracing::error!(error = %e, path = %request.path, "governance lookup failed");
                Err(EvaluationError::Store(e).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn first_denial(
        &self,
        actor: &Actor,
        request: &RequestContext,
        requirement: &Requirement,
    ) -> Result<Option<Denial>, EvaluationError> {
        if requirement.require_tenant_isolation {
            if let Some(denial) = tenant_isolation(actor, request)? {
                return Ok(Some(denial));
            }
        }

        if requirement.require_department_scope && actor.role == Role::CollegeHod {
            if let Some(denial) = self.department_scope(actor, request).await? {
                return Ok(Some(denial));
            }
        }

        if let Some(capability) = requirement.required_capability {
            if actor.role == Role::Faculty {
                if let Some(denial) = self.faculty_capability(actor, request, capability).await? {
                    return Ok(Some(denial));
                }
            }
        }

        if requirement.forbids(actor.role) {
            return Ok(Denial::new(
                ViolationKind::RoleBoundaryViolation,
                format!("role {} is not permitted to perform this operation", actor.role),
            ));
        }

        Ok(None)
    }

    async fn department_scope(
        &self,
        actor: &Actor,
        request: &RequestContext,
    ) -> Result<Option<Denial>, EvaluationError> {
        let Some(department_id) = request.addressed_department_id()? else {
            return Ok(None);
        };

        match self.store.department_by_id(department_id).await? {
            Some(department) if department.hod_id == Some(actor.id) => Ok(None),
            Some(_) => Ok(Denial::new(
                ViolationKind::RoleBoundaryViolation,
                format!(
                    "department head {} attempted to access department {department_id}{}",
                    actor.id,
                    self.own_department_suffix(actor).await
                ),
            )),
            None => Ok(Denial::new(
                ViolationKind::RoleBoundaryViolation,
                format!(
                    "department head {} addressed unknown department {department_id}",
                    actor.id
                ),
            )),
        }
    }

    /// Audit context only; a failed lookup here must not turn a denial into an error.
    async fn own_department_suffix(&self, actor: &Actor) -> String {
        match self.store.department_by_hod(actor.id).await {
            Ok(Some(own)) => format!(" (heads department {})", own.id),
            Ok(None) => " (heads no department)".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve department head's own department");
                String::new()
            }
        }
    }

    async fn faculty_capability(
        &self,
        actor: &Actor,
        request: &RequestContext,
        capability: Capability,
    ) -> Result<Option<Denial>, EvaluationError> {
        let department_id: DepartmentId = match request.addressed_department_id()? {
            Some(id) => id,
            None => actor
                .department_id
                .ok_or(EvaluationError::DepartmentContextRequired(capability))?,
        };

        let Some(assignment) = self.store.faculty_assignment(actor.id, department_id).await? else {
            return Ok(Denial::new(
                ViolationKind::PermissionDenied,
                format!("faculty {} has no assignment in department {department_id}", actor.id),
            ));
        };

        if assignment.user_id != actor.id || assignment.department_id != department_id {
            return Ok(Denial::new(
                ViolationKind::PermissionDenied,
                format!("assignment {} does not belong to this faculty/department pair", assignment.id),
            ));
        }

        if !assignment.is_active() {
            return Ok(Denial::new(
                ViolationKind::PermissionDenied,
                format!("faculty assignment {} is {}", assignment.id, assignment.status.as_str()),
            ));
        }

        match &assignment.permission {
            None => Ok(Denial::new(
                ViolationKind::PermissionDenied,
                format!("faculty assignment {} has no permission set", assignment.id),
            )),
            Some(set) if !set.grants(capability) => Ok(Denial::new(
                ViolationKind::PermissionDenied,
                format!("permission set '{}' does not grant {capability}", set.name),
            )),
            Some(_) => Ok(None),
        }
    }
}

fn tenant_isolation(actor: &Actor, request: &RequestContext) -> Result<Option<Denial>, EvaluationError> {
    let Some(target) = request.addressed_college_id()? else {
        return Ok(None);
    };

    if let Some(own) = actor.college_id {
        if own != target {
            return Ok(Denial::new(
                ViolationKind::CrossTenantAccessAttempt,
                format!("{} of college {own} attempted to access college {target}", actor.role),
            ));
        }
    }

    match actor.role {
        role if role.is_platform_owner() => {
            if actor.college_id.is_none() {
                tracing::info!(
                    target: OVERSIGHT_TARGET,
                    actor_id = %actor.id,
                    college_id = %target,
                    path = %request.path,
                    "platform owner accessed college-scoped data"
                );
            }
            Ok(None)
        }
        Role::PublisherAdmin => Ok(Denial::new(
            ViolationKind::DataIsolationBreachAttempt,
            format!("publisher admin attempted to access college-scoped data of college {target}"),
        )),
        role if role.is_college_scoped() && actor.college_id.is_none() => Ok(Denial::new(
            ViolationKind::CrossTenantAccessAttempt,
            format!("{role} without a college affiliation attempted to access college {target}"),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::request::{COLLEGE_ID_PARAM, DEPARTMENT_ID_PARAM};
    use crate::store::{AssignmentStatus, Department, FacultyAssignment};
    use crate::testing::{FailingAuditLog, FakeStore, RecordingAuditLog};
    use crate::FacultyPermissionSet;
    use bitflow_core::{AssignmentId, CollegeId, PublisherId, UserId};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    struct Harness {
        evaluator: PolicyEvaluator<Arc<FakeStore>>,
        store: Arc<FakeStore>,
        log: Arc<RecordingAuditLog>,
    }

    impl Harness {
        fn new(store: FakeStore) -> Self {
            let store = Arc::new(store);
            let log = Arc::new(RecordingAuditLog::default());
            let sink = Arc::new(AuditSink::new(log.clone(), Arc::new(FailingAuditLog)));
            Self {
                evaluator: PolicyEvaluator::new(store.clone(), sink),
                store,
                log,
            }
        }

        async fn eval(&self, actor: &Actor, request: &RequestContext, req: &Requirement) -> Decision {
            self.evaluator.evaluate(Some(actor), request, Some(req)).await.unwrap()
        }
    }

    fn department(college_id: CollegeId, hod_id: Option<UserId>) -> Department {
        Department {
            id: DepartmentId::new(),
            college_id,
            name: "Computer Science".into(),
            hod_id,
        }
    }

    fn assignment(
        user_id: UserId,
        department: &Department,
        permission: Option<FacultyPermissionSet>,
    ) -> FacultyAssignment {
        FacultyAssignment {
            id: AssignmentId::new(),
            user_id,
            department_id: department.id,
            college_id: department.college_id,
            status: AssignmentStatus::Active,
            subjects: vec!["Algorithms".into()],
            permission,
        }
    }

    fn college_request(college_id: CollegeId) -> RequestContext {
        RequestContext::new("GET", format!("/colleges/{college_id}"))
            .with_path_param(COLLEGE_ID_PARAM, college_id.to_string())
    }

    fn department_request(department_id: DepartmentId) -> RequestContext {
        RequestContext::new("GET", format!("/departments/{department_id}"))
            .with_path_param(DEPARTMENT_ID_PARAM, department_id.to_string())
    }

    fn denied_kind(decision: &Decision) -> Option<ViolationKind> {
        match decision {
            Decision::Deny { kind, .. } => Some(*kind),
            Decision::Allow => None,
        }
    }

    #[tokio::test]
    async fn anonymous_and_unconstrained_requests_are_allowed_without_lookups() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::Student).in_college(CollegeId::new());
        let request = college_request(CollegeId::new());

        let strict = Requirement::none().tenant_isolated();
        assert_eq!(
            h.evaluator.evaluate(None, &request, Some(&strict)).await.unwrap(),
            Decision::Allow
        );
        assert_eq!(
            h.evaluator.evaluate(Some(&actor), &request, None).await.unwrap(),
            Decision::Allow
        );
        assert_eq!(h.eval(&actor, &request, &Requirement::none()).await, Decision::Allow);

        assert!(h.log.records().is_empty());
        assert_eq!(h.store.lookups(), 0);
    }

    #[tokio::test]
    async fn same_college_passes_tenant_isolation() {
        let h = Harness::new(FakeStore::default());
        let college = CollegeId::new();
        let actor = Actor::new(UserId::new(), Role::CollegeAdmin).in_college(college);

        let decision = h.eval(&actor, &college_request(college), &Requirement::none().tenant_isolated()).await;
        assert_eq!(decision, Decision::Allow);
        assert!(h.log.records().is_empty());
    }

    #[tokio::test]
    async fn request_without_addressed_college_passes_tenant_isolation() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::PublisherAdmin).for_publisher(PublisherId::new());

        let request = RequestContext::new("GET", "/packages");
        let decision = h.eval(&actor, &request, &Requirement::none().tenant_isolated()).await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn cross_tenant_request_is_denied_and_audited() {
        let h = Harness::new(FakeStore::default());
        let own = CollegeId::new();
        let other = CollegeId::new();
        let actor = Actor::new(UserId::new(), Role::CollegeDean).in_college(own);

        let request = college_request(other).with_client(Some("10.0.0.7".into()), Some("curl/8".into()));
        let decision = h.eval(&actor, &request, &Requirement::none().tenant_isolated()).await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::CrossTenantAccessAttempt));

        let records = h.log.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.actor_id, actor.id);
        assert_eq!(record.college_id, Some(own));
        assert_eq!(record.kind, ViolationKind::CrossTenantAccessAttempt);
        assert_eq!(record.request_method, "GET");
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(record.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(record.request_params["path"]["collegeId"], other.to_string());
    }

    #[tokio::test]
    async fn college_role_without_affiliation_is_treated_as_cross_tenant() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::Student);

        let decision = h
            .eval(&actor, &college_request(CollegeId::new()), &Requirement::none().tenant_isolated())
            .await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::CrossTenantAccessAttempt));
    }

    // Scenario: publisher admin against any college.
    #[tokio::test]
    async fn publisher_admin_is_denied_college_scoped_data() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::PublisherAdmin).for_publisher(PublisherId::new());

        let decision = h
            .eval(&actor, &college_request(CollegeId::new()), &Requirement::none().tenant_isolated())
            .await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::DataIsolationBreachAttempt));

        let records = h.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].publisher_id, actor.publisher_id);
    }

    // Scenario: platform owner against the same request.
    #[tokio::test]
    async fn platform_owner_crosses_tenants_without_a_violation() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::BitflowOwner);

        let decision = h
            .eval(&actor, &college_request(CollegeId::new()), &Requirement::none().tenant_isolated())
            .await;
        assert_eq!(decision, Decision::Allow);
        assert!(h.log.records().is_empty());
    }

    /// Counts events emitted on one target.
    struct TargetCounter {
        target: &'static str,
        hits: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> Layer<S> for TargetCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: layer::Context<'_, S>) {
            if event.metadata().target() == self.target {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    async fn oversight_events(actor: &Actor, target: CollegeId) -> (Decision, usize) {
        let hits = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(TargetCounter {
            target: OVERSIGHT_TARGET,
            hits: hits.clone(),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let h = Harness::new(FakeStore::default());
        let decision = h
            .eval(actor, &college_request(target), &Requirement::none().tenant_isolated())
            .await;
        (decision, hits.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn platform_owner_crossing_tenants_is_traced_for_oversight() {
        let actor = Actor::new(UserId::new(), Role::BitflowOwner);
        let (decision, events) = oversight_events(&actor, CollegeId::new()).await;
        assert_eq!(decision, Decision::Allow);
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn same_college_access_emits_no_oversight_event() {
        let college = CollegeId::new();

        let owner = Actor::new(UserId::new(), Role::BitflowOwner).in_college(college);
        let (decision, events) = oversight_events(&owner, college).await;
        assert_eq!(decision, Decision::Allow);
        assert_eq!(events, 0);

        let admin = Actor::new(UserId::new(), Role::CollegeAdmin).in_college(college);
        let (decision, events) = oversight_events(&admin, college).await;
        assert_eq!(decision, Decision::Allow);
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn department_head_is_allowed_in_own_department() {
        let hod = UserId::new();
        let college = CollegeId::new();
        let dept = department(college, Some(hod));
        let h = Harness::new(FakeStore::default().with_department(dept.clone()));
        let actor = Actor::new(hod, Role::CollegeHod).in_college(college);

        let decision = h
            .eval(&actor, &department_request(dept.id), &Requirement::none().department_scoped())
            .await;
        assert_eq!(decision, Decision::Allow);
    }

    // Scenario: H1 addresses D2 whose head is H9.
    #[tokio::test]
    async fn department_head_is_denied_other_department() {
        let college = CollegeId::new();
        let h1 = UserId::new();
        let h9 = UserId::new();
        let d1 = department(college, Some(h1));
        let d2 = department(college, Some(h9));
        let h = Harness::new(
            FakeStore::default()
                .with_department(d1.clone())
                .with_department(d2.clone()),
        );
        let actor = Actor::new(h1, Role::CollegeHod).in_college(college);

        let decision = h
            .eval(&actor, &department_request(d2.id), &Requirement::none().department_scoped())
            .await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::RoleBoundaryViolation));

        let records = h.log.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].description.contains(&d1.id.to_string()));
    }

    #[tokio::test]
    async fn department_head_addressing_unknown_department_is_denied() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::CollegeHod);

        let decision = h
            .eval(&actor, &department_request(DepartmentId::new()), &Requirement::none().department_scoped())
            .await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::RoleBoundaryViolation));
    }

    #[tokio::test]
    async fn department_scope_ignores_other_roles() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::CollegeDean);

        let decision = h
            .eval(&actor, &department_request(DepartmentId::new()), &Requirement::none().department_scoped())
            .await;
        assert_eq!(decision, Decision::Allow);
        assert_eq!(h.store.lookups(), 0);
    }

    #[tokio::test]
    async fn faculty_with_granted_capability_is_allowed() {
        let f1 = UserId::new();
        let dept = department(CollegeId::new(), None);
        let set = FacultyPermissionSet::named("Course author").with(Capability::CanCreateCourses, true);
        let h = Harness::new(
            FakeStore::default()
                .with_department(dept.clone())
                .with_assignment(assignment(f1, &dept, Some(set))),
        );
        let actor = Actor::new(f1, Role::Faculty);

        let req = Requirement::none().requires(Capability::CanCreateCourses);
        assert_eq!(h.eval(&actor, &department_request(dept.id), &req).await, Decision::Allow);
        assert!(h.log.records().is_empty());
    }

    #[tokio::test]
    async fn faculty_falls_back_to_recorded_department() {
        let f1 = UserId::new();
        let dept = department(CollegeId::new(), None);
        let set = FacultyPermissionSet::named("Analyst").with(Capability::CanViewAnalytics, true);
        let h = Harness::new(FakeStore::default().with_assignment(assignment(f1, &dept, Some(set))));
        let actor = Actor::new(f1, Role::Faculty).in_department(dept.id);

        let req = Requirement::none().requires(Capability::CanViewAnalytics);
        let decision = h.eval(&actor, &RequestContext::new("GET", "/analytics"), &req).await;
        assert_eq!(decision, Decision::Allow);
    }

    // Scenario: F1 in D1 with canCreateCourses = false.
    #[tokio::test]
    async fn faculty_with_capability_false_is_denied() {
        let f1 = UserId::new();
        let d1 = department(CollegeId::new(), None);
        let set = FacultyPermissionSet::named("Reader").with(Capability::CanCreateCourses, false);
        let h = Harness::new(FakeStore::default().with_assignment(assignment(f1, &d1, Some(set))));
        let actor = Actor::new(f1, Role::Faculty);

        let req = Requirement::none().requires(Capability::CanCreateCourses);
        let decision = h.eval(&actor, &department_request(d1.id), &req).await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::PermissionDenied));
        assert_eq!(h.log.records().len(), 1);
    }

    #[tokio::test]
    async fn faculty_negative_cases_are_permission_denied() {
        let f1 = UserId::new();
        let d1 = department(CollegeId::new(), None);
        let d2 = department(d1.college_id, None);
        let granted = FacultyPermissionSet::named("Author").with(Capability::CanEditCourses, true);

        let mut inactive = assignment(f1, &d2, Some(granted.clone()));
        inactive.status = AssignmentStatus::Inactive;
        let d3 = department(d1.college_id, None);

        let h = Harness::new(
            FakeStore::default()
                // granted in D1 only
                .with_assignment(assignment(f1, &d1, Some(granted.clone())))
                .with_assignment(inactive)
                .with_assignment(assignment(f1, &d3, None)),
        );
        let actor = Actor::new(f1, Role::Faculty).in_department(d1.id);
        let req = Requirement::none().requires(Capability::CanEditCourses);

        // no assignment at all
        let unknown = DepartmentId::new();
        // wrong department: the D1 grant must not leak into D2
        for target in [unknown, d2.id, d3.id] {
            let decision = h.eval(&actor, &department_request(target), &req).await;
            assert_eq!(
                denied_kind(&decision),
                Some(ViolationKind::PermissionDenied),
                "department {target}"
            );
        }
        assert_eq!(h.log.records().len(), 3);

        assert_eq!(h.eval(&actor, &department_request(d1.id), &req).await, Decision::Allow);
    }

    #[tokio::test]
    async fn faculty_without_department_context_is_a_caller_error() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::Faculty);

        let req = Requirement::none().requires(Capability::CanGradeSubmissions);
        let err = h
            .evaluator
            .evaluate(Some(&actor), &RequestContext::new("POST", "/grades"), Some(&req))
            .await
            .unwrap_err();
        assert_eq!(err, EvaluationError::DepartmentContextRequired(Capability::CanGradeSubmissions));
        assert!(h.log.records().is_empty());

        let err = h
            .evaluator
            .enforce(Some(&actor), &RequestContext::new("POST", "/grades"), Some(&req))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn capability_requirement_ignores_non_faculty() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::CollegeAdmin);

        let req = Requirement::none().requires(Capability::CanDeleteCourses);
        assert_eq!(h.eval(&actor, &RequestContext::new("DELETE", "/c"), &req).await, Decision::Allow);
    }

    #[tokio::test]
    async fn forbidden_role_is_denied_after_earlier_checks_pass() {
        let college = CollegeId::new();
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::Student).in_college(college);

        let req = Requirement::none().tenant_isolated().forbid(Role::Student);
        let decision = h.eval(&actor, &college_request(college), &req).await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::RoleBoundaryViolation));
    }

    #[tokio::test]
    async fn first_denial_wins() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::Student).in_college(CollegeId::new());

        let req = Requirement::none().tenant_isolated().forbid(Role::Student);
        let decision = h.eval(&actor, &college_request(CollegeId::new()), &req).await;
        assert_eq!(denied_kind(&decision), Some(ViolationKind::CrossTenantAccessAttempt));
        assert_eq!(h.log.records().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_neither_allow_nor_deny() {
        let h = Harness::new(FakeStore::default());
        h.store.go_offline();
        let actor = Actor::new(UserId::new(), Role::CollegeHod);
        let req = Requirement::none().department_scoped();

        let err = h
            .evaluator
            .evaluate(Some(&actor), &department_request(DepartmentId::new()), Some(&req))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Store(StoreError::Timeout(_))));
        assert!(h.log.records().is_empty());

        let err = h
            .evaluator
            .enforce(Some(&actor), &department_request(DepartmentId::new()), Some(&req))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Internal(_)));
    }

    #[tokio::test]
    async fn malformed_college_id_is_a_caller_error() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::CollegeAdmin).in_college(CollegeId::new());
        let request = RequestContext::new("GET", "/colleges/abc").with_path_param(COLLEGE_ID_PARAM, "abc");

        let err = h
            .evaluator
            .enforce(Some(&actor), &request, Some(&Requirement::none().tenant_isolated()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::BadRequest(_)));
        assert!(h.log.records().is_empty());
    }

    #[tokio::test]
    async fn denial_is_surfaced_as_uniform_forbidden() {
        let h = Harness::new(FakeStore::default());
        let actor = Actor::new(UserId::new(), Role::PublisherAdmin);

        let err = h
            .evaluator
            .enforce(Some(&actor), &college_request(CollegeId::new()), Some(&Requirement::none().tenant_isolated()))
            .await
            .unwrap_err();
        assert_eq!(err, GovernanceError::Forbidden);
        assert_eq!(err.to_string(), "access denied");
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a non-owner addressing a college other than its own is
        /// always denied, with exactly one record per request.
        #[test]
        fn cross_college_access_is_always_denied(
            role in role_strategy(),
            own in any::<u128>(),
            target in any::<u128>(),
        ) {
            prop_assume!(role != Role::BitflowOwner);
            prop_assume!(own != target);

            let own = CollegeId::from_uuid(uuid::Uuid::from_u128(own));
            let target = CollegeId::from_uuid(uuid::Uuid::from_u128(target));
            let h = Harness::new(FakeStore::default());
            let actor = Actor::new(UserId::new(), role).in_college(own);

            let decision = runtime().block_on(
                h.eval(&actor, &college_request(target), &Requirement::none().tenant_isolated()),
            );

            let kind = denied_kind(&decision);
            prop_assert!(matches!(
                kind,
                Some(ViolationKind::CrossTenantAccessAttempt | ViolationKind::DataIsolationBreachAttempt)
            ));
            prop_assert_eq!(h.log.records().len(), 1);
        }

        /// Property: repeating a denied request N times yields N records and
        /// never flips to allow.
        #[test]
        fn repeated_denials_are_not_deduplicated(n in 1usize..12) {
            let h = Harness::new(FakeStore::default());
            let actor = Actor::new(UserId::new(), Role::Faculty).in_college(CollegeId::new());
            let req = Requirement::none().forbid(Role::Faculty);
            let request = RequestContext::new("DELETE", "/courses/1");

            let rt = runtime();
            for _ in 0..n {
                let decision = rt.block_on(h.eval(&actor, &request, &req));
                prop_assert_eq!(denied_kind(&decision), Some(ViolationKind::RoleBoundaryViolation));
            }
            prop_assert_eq!(h.log.records().len(), n);
        }
    }
}
