use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use loyalty_infra::LoyaltyServices;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn login(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.accounts.authenticate(&body.email, &body.password).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn me(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.accounts.current_user(ctx.caller()).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
