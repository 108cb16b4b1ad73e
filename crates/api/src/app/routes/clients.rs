use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;

use loyalty_core::PageRequest;
use loyalty_infra::LoyaltyServices;

use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/", post(create_client).get(list_clients))
}

pub async fn create_client(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Json(body): Json<dto::CreateClientRequest>,
) -> axum::response::Response {
    match services.clients.create(ctx.caller(), body.into()).await {
        Ok(client) => (StatusCode::CREATED, Json(dto::client_to_json(&client))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `?cpf=` is an exact cross-store lookup returning at most one item;
/// otherwise a store-filtered page.
pub async fn list_clients(
    Extension(services): Extension<Arc<LoyaltyServices>>,
    Extension(ctx): Extension<CallerContext>,
    Query(query): Query<dto::ClientsQuery>,
) -> axum::response::Response {
    if let Some(cpf) = query.cpf.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return match services.clients.find_by_tax_id(cpf).await {
            Ok(found) => {
                let items = found.iter().map(dto::client_to_json).collect::<Vec<_>>();
                (
                    StatusCode::OK,
                    Json(json!({ "total": items.len(), "page": 1, "per_page": items.len(), "items": items })),
                )
                    .into_response()
            }
            Err(e) => errors::service_error_to_response(e),
        };
    }

    let page = PageRequest::new(query.page, query.per_page);
    match services.clients.list(ctx.caller(), page).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(&page, dto::client_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
