use axum::{routing::post, Router};

pub mod accounts;
pub mod invoices;
pub mod system;

/// Routes reachable without an API key.
pub fn public_router() -> Router {
    Router::new().route("/accounts", post(accounts::create_account))
}

/// Router for all endpoints that act as the calling account.
pub fn router() -> Router {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/invoices", invoices::router())
}
