//! Infrastructure layer: stores, ledger services, DB wiring and config.

pub mod account_store;
pub mod config;
pub mod db;
pub mod error;
pub mod invoice_service;
pub mod invoice_store;
pub mod ledger;


pub use error::{ServiceError, StoreError};
pub use invoice_service::InvoiceService;
pub use ledger::LedgerService;
