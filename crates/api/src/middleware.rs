use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use loyalty_infra::LoyaltyServices;

use crate::app::errors;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<LoyaltyServices>,
}

/// Resolve the bearer token into a [`CallerContext`] request extension.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(unauthenticated)?;

    let caller = state
        .services
        .accounts
        .resolve(token)
        .map_err(|_e| unauthenticated(StatusCode::UNAUTHORIZED))?;

    req.extensions_mut().insert(CallerContext::new(caller));

    Ok(next.run(req).await)
}

/// Gate for the `/admin` subtree. Runs before body extraction, so a
/// non-admin gets 403 even for a malformed payload.
pub async fn require_admin(
    Extension(ctx): Extension<CallerContext>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    loyalty_auth::require_admin(ctx.caller())
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))?;
    Ok(next.run(req).await)
}

fn unauthenticated(status: StatusCode) -> Response {
    errors::json_error(status, "unauthenticated", "authentication required")
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
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
