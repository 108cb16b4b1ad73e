use axum::{Router, routing::{get, post}};

pub mod admin;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod redemptions;
pub mod system;
pub mod visits;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new().route("/auth/login", post(auth::login))
}

/// Router for all authenticated (store-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/admin", admin::router())
        .nest("/clients", clients::router())
        .nest("/visits", visits::router())
        .nest("/redemptions", redemptions::router())
        .nest("/dashboard", dashboard::router())
}
