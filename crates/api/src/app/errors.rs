use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use loyalty_auth::AuthError;
use loyalty_core::DomainError;
use loyalty_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Auth(AuthError::InvalidCredentials) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password")
        }
        ServiceError::Auth(AuthError::Unauthenticated | AuthError::InconsistentScope) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
        }
        ServiceError::Auth(AuthError::Forbidden(msg)) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            internal()
        }
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "internal failure");
            internal()
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
        e @ DomainError::InvalidBirthday(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_birthday", e.to_string())
        }
        DomainError::NotFound(kind) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{kind} not found"),
        ),
        DomainError::Conflict(kind) => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "conflict",
                "kind": kind,
                "message": kind.to_string(),
            })),
        )
            .into_response(),
        DomainError::NotEligible { visits_count, threshold } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "not_eligible",
                "message": format!("client has {visits_count} of {threshold} required visits"),
                "visits_count": visits_count,
                "threshold": threshold,
            })),
        )
            .into_response(),
        DomainError::NoStoreAvailable => {
            json_error(StatusCode::NOT_FOUND, "no_store_available", "no store available")
        }
    }
}

fn internal() -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
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

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_core::{ConflictKind, EntityKind};
    use loyalty_infra::StoreError;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        let cases = [
            (ServiceError::Auth(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ServiceError::Auth(AuthError::Forbidden("x".into())), StatusCode::FORBIDDEN),
            (DomainError::NotFound(EntityKind::Client).into(), StatusCode::NOT_FOUND),
            (DomainError::validation("x").into(), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::Conflict(ConflictKind::DuplicateTaxId).into(), StatusCode::CONFLICT),
            (
                DomainError::NotEligible { visits_count: 1, threshold: 2 }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Storage(StoreError::Backend("connection reset".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
