use rust_decimal::Decimal;
use serde::Deserialize;

use gateway_accounts::NewAccount;
use gateway_invoicing::NewInvoice;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub api_key: Option<String>,
    pub balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub amount: Decimal,
    pub description: Option<String>,
}

// -------------------------
// Mapping helpers
// -------------------------

impl From<CreateAccountRequest> for NewAccount {
    fn from(body: CreateAccountRequest) -> Self {
        let mut input = NewAccount::new(body.name.trim(), body.email.trim());
        if let Some(key) = body.api_key {
            input = input.with_api_key(key);
        }
        if let Some(balance) = body.balance {
            input = input.with_balance(balance);
        }
        input
    }
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(body: CreateInvoiceRequest) -> Self {
        NewInvoice {
            amount: body.amount,
            description: body.description.unwrap_or_default(),
        }
    }
}
