use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use crate::app::services::AppServices;
use crate::context::ActorContext;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "auditEscalations": services.evaluator.sink().escalations(),
    }))
}

pub async fn whoami(Extension(ctx): Extension<ActorContext>) -> impl IntoResponse {
    let actor = ctx.actor();
    Json(json!({
        "userId": actor.id.to_string(),
        "role": actor.role.as_str(),
        "collegeId": actor.college_id.map(|c| c.to_string()),
        "publisherId": actor.publisher_id.map(|p| p.to_string()),
        "departmentId": actor.department_id.map(|d| d.to_string()),
    }))
}
