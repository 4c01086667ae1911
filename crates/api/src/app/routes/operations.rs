//! Operation names and the requirement each one carries.

use bitflow_governance::{Capability, OperationId, Requirement, Role, RouteTable, RouteTableError};

pub const DEPARTMENTS_READ: OperationId = OperationId::new("departments.read");
pub const FACULTY_ASSIGNMENT_READ: OperationId = OperationId::new("faculty.assignment.read");
pub const COURSES_AUTHORING_CHECK: OperationId = OperationId::new("courses.authoring.check");
pub const VIOLATIONS_LIST: OperationId = OperationId::new("violations.list");
pub const VIOLATIONS_SUMMARY: OperationId = OperationId::new("violations.summary");

pub fn governance_routes() -> Result<RouteTable, RouteTableError> {
    let mut table = RouteTable::new();
    table
        .register(
            DEPARTMENTS_READ,
            Requirement::none().tenant_isolated().department_scoped(),
        )?
        .register(
            FACULTY_ASSIGNMENT_READ,
            Requirement::none()
                .tenant_isolated()
                .department_scoped()
                .forbid(Role::Student),
        )?
        .register(
            COURSES_AUTHORING_CHECK,
            Requirement::none()
                .tenant_isolated()
                .department_scoped()
                .requires(Capability::CanCreateCourses)
                .forbid(Role::Student),
        )?
        .register(
            VIOLATIONS_LIST,
            Requirement::none()
                .tenant_isolated()
                .forbid_all([Role::CollegeHod, Role::Faculty, Role::Student]),
        )?
        .register(
            VIOLATIONS_SUMMARY,
            Requirement::none()
                .tenant_isolated()
                .requires(Capability::CanViewAnalytics)
                .forbid(Role::Student),
        )?;
    Ok(table)
}
