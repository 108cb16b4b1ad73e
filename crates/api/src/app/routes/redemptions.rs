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
    Router::new().route("/", post(redeem).get(list_redemptions))
}

pub async fn redeem(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Json(body): Json<dto::RedeemRequest>,
) -> axum::response::Response {
    let reference = match body.client.to_ref() {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e.into()),
    };
    match services
        .redemptions
        .redeem(ctx.caller(), &reference, body.gift_name.as_deref())
        .await
    {
        Ok(redemption) => (StatusCode::CREATED, Json(dto::redemption_to_json(&redemption))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_redemptions(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let page = PageRequest::new(query.page, query.per_page);
    match services.redemptions.list(ctx.caller(), page).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(&page, dto::redemption_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
