use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use gateway_core::InvoiceId;
use gateway_invoicing::NewInvoice;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/settle", post(settle_invoice))
        .route("/:id/reject", post(reject_invoice))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> axum::response::Response {
    match services
        .invoices()
        .create(caller.api_key(), NewInvoice::from(body))
        .await
    {
        Ok(invoice) => (StatusCode::CREATED, Json(invoice)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
) -> axum::response::Response {
    match services.invoices().list_by_account(caller.api_key()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices().find_by_id(id, caller.api_key()).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn settle_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices().settle(id, caller.api_key()).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reject_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AccountContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_invoice_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices().reject(id, caller.api_key()).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_invoice_id(raw: &str) -> Result<InvoiceId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid invoice id"))
}
