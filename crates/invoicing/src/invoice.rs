use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gateway_core::money::validate_amount;
use gateway_core::{AccountId, DomainError, DomainResult, Entity, InvoiceId};

/// Invoice status lifecycle.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Approved,
    Rejected,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "approved" => Ok(InvoiceStatus::Approved),
            "rejected" => Ok(InvoiceStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown invoice status '{other}'"))),
        }
    }
}

/// Input for issuing an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

/// An invoice owned by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    account_id: AccountId,
    amount: Decimal,
    description: String,
    status: InvoiceStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue a pending invoice. The amount must be strictly positive and fit
    /// the stored money shape.
    pub fn issue(account_id: AccountId, input: NewInvoice, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount must be greater than zero"));
        }
        let amount = validate_amount(input.amount)?;

        Ok(Self {
            id: InvoiceId::new(),
            account_id,
            amount,
            description: input.description,
            status: InvoiceStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild an invoice from its stored representation.
    pub fn restore(
        id: InvoiceId,
        account_id: AccountId,
        amount: Decimal,
        description: String,
        status: InvoiceStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            amount,
            description,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, account_id: AccountId) -> bool {
        self.account_id == account_id
    }

    /// Signed delta applied to the owning account when this invoice settles.
    pub fn settlement_delta(&self) -> Decimal {
        -self.amount
    }

    /// Invariant: only pending invoices can be approved or rejected.
    pub fn ensure_pending(&self) -> DomainResult<()> {
        if self.status == InvoiceStatus::Pending {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(format!(
                "invoice {} is already {}",
                self.id, self.status
            )))
        }
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(InvoiceStatus::Approved, now)
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(InvoiceStatus::Rejected, now)
    }

    fn transition(&mut self, to: InvoiceStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Externally visible projection of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceOutput {
    pub id: InvoiceId,
    pub account_id: AccountId,
    pub amount: Decimal,
    pub description: String,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceOutput {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            account_id: invoice.account_id,
            amount: invoice.amount,
            description: invoice.description.clone(),
            status: invoice.status,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}
