use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bitflow_governance::{GovernanceError, StoreError};

/// Map a governance outcome to the client. Denials are uniform; the
/// violation kind stays in the audit trail.
pub fn governance_error_to_response(err: GovernanceError) -> axum::response::Response {
    match err {
        GovernanceError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "access denied"),
        GovernanceError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        GovernanceError::Internal(msg) => {
            tracing::error!(error = %msg, "governance evaluation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store request failed");
    let status = match err {
        StoreError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Unavailable(_) | StoreError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, "store_error", "internal error")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn not_found(what: &'static str) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

/// Parse a path/query identifier or answer 400.
pub fn parse_id<T>(field: &'static str, raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr,
{
    raw.parse::<T>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("{field} must be a UUID"),
        )
    })
}
