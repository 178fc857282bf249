use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use gateway_accounts::NewAccount;
use gateway_core::AccountId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_own_account))
        .route("/balance", post(update_balance))
        .route("/:id", get(get_account))
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "name and email are required",
        );
    }

    match services.ledger().create_account(NewAccount::from(body)).await {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_own_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
) -> axum::response::Response {
    match services.ledger().find_by_id(caller.account_id()).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    if !caller.owns(id) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "account belongs to another api key");
    }

    match services.ledger().find_by_id(id).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Json(body): Json<dto::UpdateBalanceRequest>,
) -> axum::response::Response {
    match services
        .ledger()
        .update_balance(caller.api_key(), body.amount)
        .await
    {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
