use std::sync::Arc;

use axum::{
    Router,
    handler::Handler,
    routing::{MethodRouter, get},
};

use bitflow_governance::OperationId;

use crate::app::services::AppServices;
use crate::middleware::{self, GuardState};

pub mod departments;
pub mod operations;
pub mod system;
pub mod violations;

use operations::{
    COURSES_AUTHORING_CHECK, DEPARTMENTS_READ, FACULTY_ASSIGNMENT_READ, VIOLATIONS_LIST,
    VIOLATIONS_SUMMARY,
};

/// Router for all authenticated endpoints.
pub fn router(services: &Arc<AppServices>) -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route(
            "/colleges/:collegeId/departments/:departmentId",
            guarded(services, DEPARTMENTS_READ, departments::get_department),
        )
        .route(
            "/colleges/:collegeId/departments/:departmentId/faculty/:userId",
            guarded(services, FACULTY_ASSIGNMENT_READ, departments::get_faculty_assignment),
        )
        .route(
            "/colleges/:collegeId/departments/:departmentId/courses/authoring",
            guarded(services, COURSES_AUTHORING_CHECK, departments::authoring_check),
        )
        .route(
            "/colleges/:collegeId/violations",
            guarded(services, VIOLATIONS_LIST, violations::list_violations),
        )
        .route(
            "/colleges/:collegeId/violations/summary",
            guarded(services, VIOLATIONS_SUMMARY, violations::violation_summary),
        )
}

/// `GET` route with the governance guard for `operation` in front of it.
fn guarded<H, T>(services: &AppServices, operation: OperationId, handler: H) -> MethodRouter
where
    H: Handler<T, ()>,
    T: 'static,
{
    let state = GuardState {
        evaluator: services.evaluator.clone(),
        operation,
        requirement: services.routes.requirement_for(operation).cloned(),
        max_body_bytes: services.max_body_bytes,
    };
    get(handler).route_layer(axum::middleware::from_fn_with_state(
        state,
        middleware::governance_guard,
    ))
}
