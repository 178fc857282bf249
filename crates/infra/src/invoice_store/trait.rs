use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gateway_core::{AccountId, InvoiceId};
use gateway_invoicing::{Invoice, InvoiceStatus};

use crate::error::StoreError;

/// Durable storage of invoices.
///
/// `transition_status()` is a compare-and-set on the status column: it only
/// succeeds when the stored status still equals `from`, so two settlements of
/// the same invoice cannot both claim it.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create(&self, invoice: &Invoice) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: InvoiceId) -> Result<Invoice, StoreError>;

    /// All invoices of an account, newest first.
    async fn find_by_account_id(&self, account_id: AccountId) -> Result<Vec<Invoice>, StoreError>;

    /// Move an invoice from `from` to `to`.
    ///
    /// Returns `Ok(None)` when the invoice exists but is no longer in `from`,
    /// and `StoreError::NotFound` when it does not exist.
    async fn transition_status(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, StoreError>;
}

#[async_trait]
impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    async fn create(&self, invoice: &Invoice) -> Result<(), StoreError> {
        (**self).create(invoice).await
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_account_id(&self, account_id: AccountId) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_by_account_id(account_id).await
    }

    async fn transition_status(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, StoreError> {
        (**self).transition_status(id, from, to, at).await
    }
}
