use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gateway_core::DomainError;
use gateway_infra::{ServiceError, StoreError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(StoreError::LockTimeout(msg)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "lock_timeout", msg)
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::AccountNotFound | DomainError::InvoiceNotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", message)
        }
        DomainError::DuplicateAccount => json_error(StatusCode::CONFLICT, "duplicate_account", message),
        DomainError::UnauthorizedAccess => json_error(StatusCode::FORBIDDEN, "forbidden", message),
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::InvalidTransition(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", message)
        }
    }
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
