//! Admin-only endpoints. The whole subtree sits behind
//! [`crate::middleware::require_admin`].

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;

use loyalty_core::StoreId;
use loyalty_infra::LoyaltyServices;

use crate::app::{dto, errors};
use crate::context::CallerContext;
use crate::middleware;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/:id", patch(update_store))
        .route_layer(axum::middleware::from_fn(middleware::require_admin))
}

pub async fn create_user(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    match services.accounts.create_user(ctx.caller(), body.into()).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.accounts.list_users(ctx.caller()).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_store(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Json(body): Json<dto::CreateStoreRequest>,
) -> axum::response::Response {
    match services
        .accounts
        .create_store(ctx.caller(), &body.name, body.visit_threshold)
        .await
    {
        Ok(store) => (StatusCode::CREATED, Json(dto::store_to_json(&store))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_stores(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.accounts.list_stores(ctx.caller()).await {
        Ok(stores) => {
            let items = stores.iter().map(dto::store_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_store(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStoreRequest>,
) -> axum::response::Response {
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid store id"),
    };
    match services
        .accounts
        .update_store_threshold(ctx.caller(), id, body.visit_threshold)
        .await
    {
        Ok(store) => (StatusCode::OK, Json(dto::store_to_json(&store))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
