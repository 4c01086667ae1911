//! Violation reporting for college administrators.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use bitflow_core::{CollegeId, UserId};
use bitflow_governance::{Pagination, ViolationFilter, ViolationKind, ViolationQuery};

use crate::app::{errors, services::AppServices};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationListQuery {
    pub actor_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub recorded_after: Option<DateTime<Utc>>,
    pub recorded_before: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /colleges/:collegeId/violations?type=X&actorId=Y&limit=50&offset=0
///
/// Newest first. Always scoped to the addressed college.
pub async fn list_violations(
    Extension(services): Extension<Arc<AppServices>>,
    Path(college_id): Path<String>,
    Query(query): Query<ViolationListQuery>,
) -> Response {
    let college_id: CollegeId = match errors::parse_id("collegeId", &college_id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor_id = match query.actor_id.as_deref().map(|raw| errors::parse_id::<UserId>("actorId", raw)) {
        Some(Ok(id)) => Some(id),
        Some(Err(res)) => return res,
        None => None,
    };
    let kind = match query.kind.as_deref() {
        Some(raw) => match ViolationKind::parse(raw) {
            Some(kind) => Some(kind),
            None => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_violation_type",
                    format!("unknown violation type '{raw}'"),
                );
            }
        },
        None => None,
    };

    let filter = ViolationFilter {
        college_id: Some(college_id),
        actor_id,
        kind,
        recorded_after: query.recorded_after,
        recorded_before: query.recorded_before,
    };
    let pagination = Pagination::new(
        query.offset.unwrap_or(0),
        query.limit.unwrap_or(Pagination::default().limit),
    );

    match services.violations.list_violations(filter, pagination).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /colleges/:collegeId/violations/summary
///
/// Count per violation type; every type is present, zero when unseen.
pub async fn violation_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Path(college_id): Path<String>,
) -> Response {
    let college_id: CollegeId = match errors::parse_id("collegeId", &college_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let counts = match services.violations.count_by_kind(college_id).await {
        Ok(counts) => counts,
        Err(e) => return errors::store_error_to_response(e),
    };

    let by_kind: BTreeMap<&'static str, u64> = ViolationKind::ALL
        .into_iter()
        .map(|kind| (kind.as_str(), counts.get(&kind).copied().unwrap_or(0)))
        .collect();

    Json(json!({
        "collegeId": college_id.to_string(),
        "total": by_kind.values().sum::<u64>(),
        "counts": by_kind,
    }))
    .into_response()
}
