//! Invoicing domain module.
//!
//! Invoices are billable items owned by an account. Settling one debits the
//! owning account through the ledger; this crate only holds the lifecycle
//! rules (no IO, no HTTP, no storage).

pub mod invoice;

pub use invoice::{Invoice, InvoiceOutput, InvoiceStatus, NewInvoice};
