//! Postgres-backed invoice store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use gateway_core::{AccountId, InvoiceId};
use gateway_invoicing::{Invoice, InvoiceStatus};

use super::r#trait::InvoiceStore;
use crate::error::{StoreError, map_sqlx_error};

/// Postgres-backed invoice store.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InvoiceStore for PostgresInvoiceStore {
    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id_typed()), err)]
    async fn create(&self, invoice: &Invoice) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id,
                account_id,
                amount,
                description,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invoice.id_typed().as_uuid())
        .bind(invoice.account_id().as_uuid())
        .bind(invoice.amount())
        .bind(invoice.description())
        .bind(invoice.status().as_str())
        .bind(invoice.created_at())
        .bind(invoice.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_invoice", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn find_by_id(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, amount, description, status, created_at, updated_at
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_invoice", e))?
        .ok_or(StoreError::NotFound)?;

        decode_invoice(&row)
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn find_by_account_id(&self, account_id: AccountId) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, description, status, created_at, updated_at
            FROM invoices
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_invoices_by_account", e))?;

        rows.iter().map(decode_invoice).collect()
    }

    #[instrument(skip(self, at), fields(invoice_id = %id, from = %from, to = %to), err)]
    async fn transition_status(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING id, account_id, amount, description, status, created_at, updated_at
            "#,
        )
        .bind(to.as_str())
        .bind(at)
        .bind(id.as_uuid())
        .bind(from.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transition_invoice_status", e))?;

        match updated {
            Some(row) => decode_invoice(&row).map(Some),
            None => {
                // Distinguish "gone" from "no longer in `from`".
                let exists = sqlx::query("SELECT 1 FROM invoices WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("invoice_exists", e))?;
                match exists {
                    Some(_) => Ok(None),
                    None => Err(StoreError::NotFound),
                }
            }
        }
    }
}

fn decode_invoice(row: &sqlx::postgres::PgRow) -> Result<Invoice, StoreError> {
    let row = InvoiceRow::from_row(row)
        .map_err(|e| StoreError::Decode(format!("failed to deserialize invoice row: {}", e)))?;
    let status = row
        .status
        .parse::<InvoiceStatus>()
        .map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(Invoice::restore(
        InvoiceId::from_uuid(row.id),
        AccountId::from_uuid(row.account_id),
        row.amount,
        row.description,
        status,
        row.created_at,
        row.updated_at,
    ))
}

// SQLx row types

#[derive(Debug)]
struct InvoiceRow {
    id: uuid::Uuid,
    account_id: uuid::Uuid,
    amount: Decimal,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for InvoiceRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(InvoiceRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            amount: row.try_get("amount")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
