use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use gateway_core::DomainError;
use gateway_infra::ServiceError;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::AccountContext;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Resolve the caller's account from `X-API-Key`.
///
/// A missing or unknown key is rejected with 401 before the handler runs.
pub async fn api_key_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let api_key = extract_api_key(req.headers())?.to_string();

    let account = match services.ledger().find_by_api_key(&api_key).await {
        Ok(account) => account,
        Err(ServiceError::Domain(DomainError::AccountNotFound)) => {
            return Err(errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "unknown api key",
            ));
        }
        Err(other) => return Err(errors::service_error_to_response(other)),
    };

    req.extensions_mut()
        .insert(AccountContext::new(account.id, api_key));

    Ok(next.run(req).await)
}

fn extract_api_key(headers: &HeaderMap) -> Result<&str, Response> {
    let missing = || errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing X-API-Key header");

    let header = headers.get(API_KEY_HEADER).ok_or_else(missing)?;
    let key = header.to_str().map_err(|_| missing())?.trim();
    if key.is_empty() {
        return Err(missing());
    }

    Ok(key)
}
