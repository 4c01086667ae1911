//! Postgres-backed capability lookups.
//!
//! Reads the `departments`, `faculty_assignments` and `faculty_permissions`
//! tables (see `sql/governance.sql`). Every method is a single keyed query;
//! nothing is cached.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use bitflow_core::{AssignmentId, CollegeId, DepartmentId, PermissionSetId, UserId};
use bitflow_governance::{
    AssignmentStatus, CapabilityStore, Department, FacultyAssignment, FacultyPermissionSet, StoreError,
};

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresCapabilityStore {
    pool: Arc<PgPool>,
}

impl PostgresCapabilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait::async_trait]
impl CapabilityStore for PostgresCapabilityStore {
    #[instrument(skip(self), fields(department_id = %id), err)]
    async fn department_by_id(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, college_id, name, hod_id
            FROM departments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("department_by_id", e))?;

        row.map(|r| department_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(hod_id = %hod_id), err)]
    async fn department_by_hod(&self, hod_id: UserId) -> Result<Option<Department>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, college_id, name, hod_id
            FROM departments
            WHERE hod_id = $1
            "#,
        )
        .bind(hod_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("department_by_hod", e))?;

        row.map(|r| department_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id, department_id = %department_id), err)]
    async fn faculty_assignment(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<FacultyAssignment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                a.id,
                a.user_id,
                a.department_id,
                a.college_id,
                a.status,
                a.subjects,
                p.id AS permission_id,
                p.college_id AS permission_college_id,
                p.name AS permission_name,
                p.can_create_courses,
                p.can_edit_courses,
                p.can_delete_courses,
                p.can_view_analytics,
                p.can_manage_students,
                p.can_create_tests,
                p.can_edit_tests,
                p.can_delete_tests,
                p.can_grade_submissions,
                p.can_export_reports
            FROM faculty_assignments a
            LEFT JOIN faculty_permissions p ON p.id = a.permission_id
            WHERE a.user_id = $1 AND a.department_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(department_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("faculty_assignment", e))?;

        row.map(|r| assignment_from_row(&r)).transpose()
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Query(format!("failed to read column {name}: {e}")))
}

fn department_from_row(row: &PgRow) -> Result<Department, StoreError> {
    Ok(Department {
        id: DepartmentId::from_uuid(column(row, "id")?),
        college_id: CollegeId::from_uuid(column(row, "college_id")?),
        name: column(row, "name")?,
        hod_id: column::<Option<Uuid>>(row, "hod_id")?.map(UserId::from_uuid),
    })
}

fn assignment_from_row(row: &PgRow) -> Result<FacultyAssignment, StoreError> {
    let status = match column::<String>(row, "status")?.as_str() {
        "ACTIVE" => AssignmentStatus::Active,
        "INACTIVE" => AssignmentStatus::Inactive,
        other => {
            return Err(StoreError::Query(format!("unknown assignment status '{other}'")));
        }
    };

    let permission = match column::<Option<Uuid>>(row, "permission_id")? {
        Some(pid) => Some(FacultyPermissionSet {
            id: Some(PermissionSetId::from_uuid(pid)),
            college_id: Some(CollegeId::from_uuid(column(row, "permission_college_id")?)),
            name: column(row, "permission_name")?,
            can_create_courses: column(row, "can_create_courses")?,
            can_edit_courses: column(row, "can_edit_courses")?,
            can_delete_courses: column(row, "can_delete_courses")?,
            can_view_analytics: column(row, "can_view_analytics")?,
            can_manage_students: column(row, "can_manage_students")?,
            can_create_tests: column(row, "can_create_tests")?,
            can_edit_tests: column(row, "can_edit_tests")?,
            can_delete_tests: column(row, "can_delete_tests")?,
            can_grade_submissions: column(row, "can_grade_submissions")?,
            can_export_reports: column(row, "can_export_reports")?,
        }),
        None => None,
    };

    Ok(FacultyAssignment {
        id: AssignmentId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        department_id: DepartmentId::from_uuid(column(row, "department_id")?),
        college_id: CollegeId::from_uuid(column(row, "college_id")?),
        status,
        subjects: column(row, "subjects")?,
        permission,
    })
}
