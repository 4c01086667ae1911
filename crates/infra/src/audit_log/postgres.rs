//! Postgres-backed violation log.
//!
//! Writes go to `security_violations`, which a trigger keeps append-only
//! (see `sql/governance.sql`). Re-appending a known id is a no-op, so a
//! dead-letter replay interrupted halfway can simply run again. Reads serve
//! the reporting endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};

use bitflow_core::{CollegeId, PublisherId, UserId, ViolationId};
use bitflow_governance::{
    AuditLog, Pagination, StoreError, ViolationFilter, ViolationKind, ViolationPage, ViolationQuery,
    ViolationRecord,
};

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: Arc<PgPool>,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait::async_trait]
impl AuditLog for PostgresAuditLog {
    #[instrument(
        skip(self, record),
        fields(violation_id = %record.id, kind = %record.kind, actor_id = %record.actor_id),
        err
    )]
    async fn append(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO security_violations (
                id,
                user_id,
                college_id,
                publisher_id,
                violation_type,
                description,
                request_path,
                request_method,
                request_params,
                ip_address,
                user_agent,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.actor_id.as_uuid())
        .bind(record.college_id.map(|c| *c.as_uuid()))
        .bind(record.publisher_id.map(|p| *p.as_uuid()))
        .bind(record.kind.as_str())
        .bind(&record.description)
        .bind(&record.request_path)
        .bind(&record.request_method)
        .bind(&record.request_params)
        .bind(record.ip_address.as_deref())
        .bind(record.user_agent.as_deref())
        .bind(record.recorded_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_violation", e))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ViolationQuery for PostgresAuditLog {
    #[instrument(skip(self), fields(total = tracing::field::Empty), err)]
    async fn list_violations(
        &self,
        filter: ViolationFilter,
        pagination: Pagination,
    ) -> Result<ViolationPage, StoreError> {
        let college = filter.college_id.map(|c| *c.as_uuid());
        let actor = filter.actor_id.map(|a| *a.as_uuid());
        let kind = filter.kind.map(|k| k.as_str());

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM security_violations
            WHERE ($1::uuid IS NULL OR college_id = $1)
                AND ($2::uuid IS NULL OR user_id = $2)
                AND ($3::text IS NULL OR violation_type = $3)
                AND ($4::timestamptz IS NULL OR created_at >= $4)
                AND ($5::timestamptz IS NULL OR created_at < $5)
            "#,
        )
        .bind(college)
        .bind(actor)
        .bind(kind)
        .bind(filter.recorded_after)
        .bind(filter.recorded_before)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_violations", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Query(format!("failed to read count: {e}")))?;
        Span::current().record("total", total);

        let rows = sqlx::query(
            r#"
            SELECT
                id,
                user_id,
                college_id,
                publisher_id,
                violation_type,
                description,
                request_path,
                request_method,
                request_params,
                ip_address,
                user_agent,
                created_at
            FROM security_violations
            WHERE ($1::uuid IS NULL OR college_id = $1)
                AND ($2::uuid IS NULL OR user_id = $2)
                AND ($3::text IS NULL OR violation_type = $3)
                AND ($4::timestamptz IS NULL OR created_at >= $4)
                AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(college)
        .bind(actor)
        .bind(kind)
        .bind(filter.recorded_after)
        .bind(filter.recorded_before)
        .bind(i64::try_from(pagination.limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(pagination.offset).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_violations", e))?;

        let mut violations = Vec::with_capacity(rows.len());
        for row in rows {
            let parsed = ViolationRow::from_row(&row)
                .map_err(|e| StoreError::Query(format!("failed to read violation row: {e}")))?;
            violations.push(parsed.try_into()?);
        }

        let total = total.max(0) as u64;
        Ok(ViolationPage {
            violations,
            total,
            pagination,
            has_more: pagination.has_more(total),
        })
    }

    #[instrument(skip(self), fields(college_id = %college_id), err)]
    async fn count_by_kind(
        &self,
        college_id: CollegeId,
    ) -> Result<HashMap<ViolationKind, u64>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT violation_type, COUNT(*) AS total
            FROM security_violations
            WHERE college_id = $1
            GROUP BY violation_type
            "#,
        )
        .bind(college_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_by_kind", e))?;

        let mut counts = HashMap::new();
        for row in rows {
            let raw: String = row
                .try_get("violation_type")
                .map_err(|e| StoreError::Query(format!("failed to read violation_type: {e}")))?;
            let total: i64 = row
                .try_get("total")
                .map_err(|e| StoreError::Query(format!("failed to read count: {e}")))?;
            counts.insert(parse_kind(&raw)?, total.max(0) as u64);
        }
        Ok(counts)
    }
}

fn parse_kind(raw: &str) -> Result<ViolationKind, StoreError> {
    ViolationKind::parse(raw).ok_or_else(|| StoreError::Query(format!("unknown violation_type '{raw}'")))
}

// SQLx row types

#[derive(Debug)]
struct ViolationRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    college_id: Option<uuid::Uuid>,
    publisher_id: Option<uuid::Uuid>,
    violation_type: String,
    description: String,
    request_path: String,
    request_method: String,
    request_params: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ViolationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ViolationRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            college_id: row.try_get("college_id")?,
            publisher_id: row.try_get("publisher_id")?,
            violation_type: row.try_get("violation_type")?,
            description: row.try_get("description")?,
            request_path: row.try_get("request_path")?,
            request_method: row.try_get("request_method")?,
            request_params: row.try_get("request_params")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ViolationRow> for ViolationRecord {
    type Error = StoreError;

    fn try_from(row: ViolationRow) -> Result<Self, Self::Error> {
        Ok(ViolationRecord {
            id: ViolationId::from_uuid(row.id),
            actor_id: UserId::from_uuid(row.user_id),
            college_id: row.college_id.map(CollegeId::from_uuid),
            publisher_id: row.publisher_id.map(PublisherId::from_uuid),
            kind: parse_kind(&row.violation_type)?,
            description: row.description,
            request_path: row.request_path,
            request_method: row.request_method,
            request_params: row.request_params,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            recorded_at: row.created_at,
        })
    }
}
