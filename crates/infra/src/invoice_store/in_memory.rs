use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gateway_core::{AccountId, InvoiceId};
use gateway_invoicing::{Invoice, InvoiceStatus};

use super::r#trait::InvoiceStore;
use crate::error::{INVOICES_PKEY, StoreError};

/// In-memory invoice store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn create(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| StoreError::poisoned())?;
        if invoices.contains_key(&invoice.id_typed()) {
            return Err(StoreError::duplicate(
                INVOICES_PKEY,
                format!("invoice '{}' already exists", invoice.id_typed()),
            ));
        }
        invoices.insert(invoice.id_typed(), invoice.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let invoices = self.invoices.read().map_err(|_| StoreError::poisoned())?;
        invoices.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_by_account_id(&self, account_id: AccountId) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(|_| StoreError::poisoned())?;
        let mut owned: Vec<Invoice> = invoices
            .values()
            .filter(|i| i.is_owned_by(account_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(owned)
    }

    async fn transition_status(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| StoreError::poisoned())?;
        let current = invoices.get(&id).ok_or(StoreError::NotFound)?;
        if current.status() != from {
            return Ok(None);
        }

        let next = Invoice::restore(
            current.id_typed(),
            current.account_id(),
            current.amount(),
            current.description().to_string(),
            to,
            current.created_at(),
            at,
        );
        invoices.insert(id, next.clone());
        Ok(Some(next))
    }
}
