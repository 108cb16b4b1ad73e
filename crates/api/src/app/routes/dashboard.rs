use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use loyalty_infra::LoyaltyServices;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/kpis", get(kpis))
        .route("/birthdays", get(birthdays))
}

pub async fn kpis(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.dashboard.kpis(ctx.caller()).await {
        Ok(kpis) => (StatusCode::OK, Json(kpis)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn birthdays(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.dashboard.birthdays_this_month(ctx.caller()).await {
        Ok(clients) => {
            let items = clients.iter().map(dto::client_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
