//! Invoice service.
//!
//! Invoices belong to the account whose API key created them. Settling a
//! pending invoice claims it (compare-and-set `pending -> approved`) and then
//! debits the owner through the ledger, so a given invoice is charged at most
//! once even when settlements race. A failed debit releases the claim.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use gateway_core::{DomainError, InvoiceId};
use gateway_invoicing::{Invoice, InvoiceOutput, InvoiceStatus, NewInvoice};

use crate::account_store::AccountStore;
use crate::error::ServiceError;
use crate::invoice_store::InvoiceStore;
use crate::ledger::LedgerService;

pub struct InvoiceService<A, I> {
    ledger: Arc<LedgerService<A>>,
    invoices: I,
}

impl<A, I> InvoiceService<A, I>
where
    A: AccountStore,
    I: InvoiceStore,
{
    pub fn new(ledger: Arc<LedgerService<A>>, invoices: I) -> Self {
        Self { ledger, invoices }
    }

    pub fn ledger(&self) -> &LedgerService<A> {
        &self.ledger
    }

    /// Issue a pending invoice for the caller's account.
    #[instrument(skip(self, api_key, input), fields(invoice_id = tracing::field::Empty), err)]
    pub async fn create(&self, api_key: &str, input: NewInvoice) -> Result<InvoiceOutput, ServiceError> {
        let account = self.ledger.find_by_api_key(api_key).await?;
        let invoice = Invoice::issue(account.id, input, Utc::now())?;
        tracing::Span::current().record("invoice_id", tracing::field::display(invoice.id_typed()));

        self.invoices
            .create(&invoice)
            .await
            .map_err(ServiceError::from_invoice_store)?;

        info!(account_id = %account.id, amount = %invoice.amount(), "invoice created");
        Ok(InvoiceOutput::from(&invoice))
    }

    pub async fn find_by_id(&self, id: InvoiceId, api_key: &str) -> Result<InvoiceOutput, ServiceError> {
        let invoice = self.owned_invoice(id, api_key).await?;
        Ok(InvoiceOutput::from(&invoice))
    }

    /// Invoices of the caller's account, newest first.
    pub async fn list_by_account(&self, api_key: &str) -> Result<Vec<InvoiceOutput>, ServiceError> {
        let account = self.ledger.find_by_api_key(api_key).await?;
        let invoices = self
            .invoices
            .find_by_account_id(account.id)
            .await
            .map_err(ServiceError::from_invoice_store)?;
        Ok(invoices.iter().map(InvoiceOutput::from).collect())
    }

    /// Approve a pending invoice and debit its amount from the owner.
    #[instrument(skip(self, api_key), fields(invoice_id = %id), err)]
    pub async fn settle(&self, id: InvoiceId, api_key: &str) -> Result<InvoiceOutput, ServiceError> {
        let invoice = self.owned_invoice(id, api_key).await?;
        invoice.ensure_pending()?;

        let claimed = self
            .claim(id, InvoiceStatus::Pending, InvoiceStatus::Approved)
            .await?;

        if let Err(err) = self.ledger.update_balance(api_key, claimed.settlement_delta()).await {
            // Release the claim so the invoice can be settled again later.
            match self
                .invoices
                .transition_status(id, InvoiceStatus::Approved, InvoiceStatus::Pending, Utc::now())
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => warn!(invoice_id = %id, "settlement claim already released"),
                Err(release_err) => {
                    warn!(invoice_id = %id, error = %release_err, "failed to release settlement claim")
                }
            }
            return Err(err);
        }

        info!(invoice_id = %id, amount = %claimed.amount(), "invoice settled");
        Ok(InvoiceOutput::from(&claimed))
    }

    /// Reject a pending invoice. No money moves.
    #[instrument(skip(self, api_key), fields(invoice_id = %id), err)]
    pub async fn reject(&self, id: InvoiceId, api_key: &str) -> Result<InvoiceOutput, ServiceError> {
        let invoice = self.owned_invoice(id, api_key).await?;
        invoice.ensure_pending()?;

        let rejected = self
            .claim(id, InvoiceStatus::Pending, InvoiceStatus::Rejected)
            .await?;

        info!(invoice_id = %id, "invoice rejected");
        Ok(InvoiceOutput::from(&rejected))
    }

    async fn owned_invoice(&self, id: InvoiceId, api_key: &str) -> Result<Invoice, ServiceError> {
        let account = self.ledger.find_by_api_key(api_key).await?;
        let invoice = self
            .invoices
            .find_by_id(id)
            .await
            .map_err(ServiceError::from_invoice_store)?;

        if !invoice.is_owned_by(account.id) {
            return Err(DomainError::UnauthorizedAccess.into());
        }
        Ok(invoice)
    }

    async fn claim(&self, id: InvoiceId, from: InvoiceStatus, to: InvoiceStatus) -> Result<Invoice, ServiceError> {
        self.invoices
            .transition_status(id, from, to, Utc::now())
            .await
            .map_err(ServiceError::from_invoice_store)?
            .ok_or_else(|| {
                DomainError::invalid_transition(format!("invoice {id} is no longer {from}")).into()
            })
    }
}
