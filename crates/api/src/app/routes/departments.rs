//! Department and faculty reads behind the governance guard.
//!
//! The guard has already enforced tenancy and department scope by the time
//! these run; handlers only check that the record belongs to the addressed
//! college.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bitflow_core::{CollegeId, DepartmentId, UserId};
use bitflow_governance::{Capability, CapabilityStore};

use crate::app::{errors, services::AppServices};

/// GET /colleges/:collegeId/departments/:departmentId
pub async fn get_department(
    Extension(services): Extension<Arc<AppServices>>,
    Path((college_id, department_id)): Path<(String, String)>,
) -> Response {
    let (college_id, department_id) = match parse_scope(&college_id, &department_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };

    match services.capabilities.department_by_id(department_id).await {
        Ok(Some(department)) if department.college_id == college_id => Json(department).into_response(),
        Ok(_) => errors::not_found("department"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /colleges/:collegeId/departments/:departmentId/faculty/:userId
pub async fn get_faculty_assignment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((college_id, department_id, user_id)): Path<(String, String, String)>,
) -> Response {
    let (college_id, department_id) = match parse_scope(&college_id, &department_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    let user_id: UserId = match errors::parse_id("userId", &user_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.capabilities.faculty_assignment(user_id, department_id).await {
        Ok(Some(assignment)) if assignment.college_id == college_id => Json(assignment).into_response(),
        Ok(_) => errors::not_found("faculty assignment"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /colleges/:collegeId/departments/:departmentId/courses/authoring
///
/// Answers whether the caller may author courses here. Reaching the handler
/// means the guard allowed it.
pub async fn authoring_check(
    Path((college_id, department_id)): Path<(String, String)>,
) -> Response {
    let (college_id, department_id) = match parse_scope(&college_id, &department_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };

    Json(json!({
        "collegeId": college_id.to_string(),
        "departmentId": department_id.to_string(),
        "capability": Capability::CanCreateCourses.as_str(),
        "allowed": true,
    }))
    .into_response()
}

fn parse_scope(college_id: &str, department_id: &str) -> Result<(CollegeId, DepartmentId), Response> {
    Ok((
        errors::parse_id("collegeId", college_id)?,
        errors::parse_id("departmentId", department_id)?,
    ))
}
