use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use bitflow_governance::{OperationId, RequestContext, Requirement};

use crate::app::errors;
use crate::app::services::Evaluator;
use crate::context::ActorContext;
use crate::jwt::JwtValidator;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(ActorContext::new(claims.actor()));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

/// Per-route governance state: the operation and its resolved requirement.
#[derive(Clone)]
pub struct GuardState {
    pub evaluator: Arc<Evaluator>,
    pub operation: OperationId,
    pub requirement: Option<Requirement>,
    pub max_body_bytes: usize,
}

/// Evaluate the route's requirement before the handler runs.
///
/// The body is buffered so JSON fields can address a college or department,
/// then handed on to the handler unchanged.
pub async fn governance_guard(
    State(state): State<GuardState>,
    path: Option<Path<HashMap<String, String>>>,
    query: Option<Query<HashMap<String, String>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return errors::json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "request body too large",
            );
        }
    };

    let mut context = RequestContext::new(parts.method.as_str(), parts.uri.path()).with_client(
        client_ip(&parts.headers, connect_info.map(|ConnectInfo(addr)| addr)),
        parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    if let Some(Path(params)) = path {
        for (key, value) in params {
            context = context.with_path_param(key, value);
        }
    }
    if let Some(Query(params)) = query {
        for (key, value) in params {
            context = context.with_query_param(key, value);
        }
    }
    if !bytes.is_empty() {
        if let Ok(json) = serde_json::from_slice(&bytes) {
            context = context.with_body(json);
        }
    }

    let actor = parts.extensions.get::<ActorContext>().map(ActorContext::actor);
    if let Err(err) = state
        .evaluator
        .enforce(actor, &context, state.requirement.as_ref())
        .await
    {
        tracing::debug!(operation = %state.operation, "request stopped by governance guard");
        return errors::governance_error_to_response(err);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}
