use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use loyalty_core::PageRequest;
use loyalty_infra::LoyaltyServices;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/", post(record_visit).get(list_visits))
}

pub async fn record_visit(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Json(body): Json<dto::ClientRefRequest>,
) -> axum::response::Response {
    let reference = match body.to_ref() {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e.into()),
    };
    match services.visits.record_visit(ctx.caller(), &reference).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::visit_record_to_json(&record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_visits(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let page = PageRequest::new(query.page, query.per_page);
    match services.visits.list(ctx.caller(), page).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(&page, dto::visit_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
