//! Postgres-backed account store implementation.
//!
//! The `accounts` table carries a unique index on `api_key`, which is the final
//! word on duplicate keys when two creates race past the service pre-check.
//! Balance updates use `SELECT ... FOR UPDATE` inside a transaction with a
//! transaction-local `lock_timeout`.
//!
//! ## Thread Safety
//!
//! `PostgresAccountStore` is `Send + Sync` and can be shared across tasks.
//! All operations go through the SQLx connection pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use gateway_accounts::Account;
use gateway_core::AccountId;

use super::r#trait::AccountStore;
use crate::error::{StoreError, map_sqlx_error};

/// Postgres-backed account store.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PostgresAccountStore {
    /// Create a new PostgresAccountStore with the given connection pool.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    #[instrument(
        skip(self, account),
        fields(account_id = %account.id_typed()),
        err
    )]
    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id,
                name,
                email,
                api_key,
                balance,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id_typed().as_uuid())
        .bind(account.name())
        .bind(account.email())
        .bind(account.api_key())
        .bind(account.balance())
        .bind(account.created_at())
        .bind(account.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;

        Ok(())
    }

    #[instrument(skip(self, api_key), err)]
    async fn find_by_api_key(&self, api_key: &str) -> Result<Account, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, api_key, balance, created_at, updated_at
            FROM accounts
            WHERE api_key = $1
            "#,
        )
        .bind(api_key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_api_key", e))?
        .ok_or(StoreError::NotFound)?;

        decode_account(&row)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, api_key, balance, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?
        .ok_or(StoreError::NotFound)?;

        decode_account(&row)
    }

    /// Lock-then-read-then-write-then-commit.
    ///
    /// Dropping the transaction on any early return rolls it back, so the
    /// stored balance is either fully updated or untouched.
    #[instrument(
        skip(self),
        fields(account_id = %id, amount = %amount, new_balance = tracing::field::Empty),
        err
    )]
    async fn update_balance_locked(&self, id: AccountId, amount: Decimal) -> Result<Account, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        set_lock_timeout(&mut tx, self.lock_timeout).await?;

        let row = sqlx::query(
            r#"
            SELECT id, name, email, api_key, balance, created_at, updated_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_account", e))?
        .ok_or(StoreError::NotFound)?;

        // The balance we mutate is the one read under the lock. A rejected
        // delta returns here and the transaction rolls back on drop.
        let mut account = decode_account(&row)?;
        account.add_balance(amount).map_err(StoreError::Rejected)?;
        account.touch(Utc::now());

        sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(account.balance())
        .bind(account.updated_at())
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_balance", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("new_balance", tracing::field::display(account.balance()));
        Ok(account)
    }
}

/// Bound the wait for row locks to this transaction only.
async fn set_lock_timeout(tx: &mut Transaction<'_, Postgres>, timeout: Duration) -> Result<(), StoreError> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", timeout.as_millis()))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;
    Ok(())
}

fn decode_account(row: &sqlx::postgres::PgRow) -> Result<Account, StoreError> {
    AccountRow::from_row(row)
        .map(Into::into)
        .map_err(|e| StoreError::Decode(format!("failed to deserialize account row: {}", e)))
}

// SQLx row types

#[derive(Debug)]
struct AccountRow {
    id: uuid::Uuid,
    name: String,
    email: String,
    api_key: String,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AccountRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            api_key: row.try_get("api_key")?,
            balance: row.try_get("balance")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account::restore(
            AccountId::from_uuid(row.id),
            row.name,
            row.email,
            row.api_key,
            row.balance,
            row.created_at,
            row.updated_at,
        )
    }
}

/// These tests need a live database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::API_KEY_CONSTRAINT;
    use gateway_accounts::NewAccount;
    use rust_decimal_macros::dec;

    async fn store() -> PostgresAccountStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect");
        crate::db::ensure_schema(&pool).await.expect("schema");
        PostgresAccountStore::new(pool, Duration::from_millis(500))
    }

    fn account(balance: Decimal) -> Account {
        Account::open(NewAccount::new("Alice", "a@x.com").with_balance(balance), Utc::now()).unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn unique_index_rejects_duplicate_api_key() {
        let store = store().await;
        let first = account(dec!(0));
        store.create(&first).await.unwrap();

        let clash = Account::open(
            NewAccount::new("Mallory", "m@x.com").with_api_key(first.api_key()),
            Utc::now(),
        )
        .unwrap();
        let err = store.create(&clash).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey { ref constraint, .. } if constraint == API_KEY_CONSTRAINT
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn concurrent_locked_updates_lose_nothing() {
        let store = Arc::new(store().await);
        let created = account(dec!(0));
        store.create(&created).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let id = created.id_typed();
            handles.push(tokio::spawn(async move {
                store.update_balance_locked(id, dec!(10)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let stored = store.find_by_id(created.id_typed()).await.unwrap();
        assert_eq!(stored.balance(), dec!(100));
    }

    #[tokio::test]
    #[ignore]
    async fn update_of_missing_row_rolls_back_with_not_found() {
        let store = store().await;
        let err = store
            .update_balance_locked(AccountId::new(), dec!(1))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    #[ignore]
    async fn stored_balance_matches_the_domain_value_exactly() {
        let store = store().await;
        let created = account(dec!(0.1234));
        store.create(&created).await.unwrap();

        let updated = store
            .update_balance_locked(created.id_typed(), dec!(1.0001))
            .await
            .unwrap();
        let stored = store.find_by_id(created.id_typed()).await.unwrap();
        assert_eq!(stored.balance(), updated.balance());
        assert_eq!(stored.balance(), dec!(1.1235));
    }

    #[tokio::test]
    #[ignore]
    async fn out_of_range_update_is_rejected_and_rolled_back() {
        let store = store().await;
        let created = account(gateway_core::money::max_amount());
        store.create(&created).await.unwrap();

        let err = store
            .update_balance_locked(created.id_typed(), Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let stored = store.find_by_id(created.id_typed()).await.unwrap();
        assert_eq!(stored.balance(), created.balance());
        // Row lock was released with the rolled-back transaction.
        store
            .update_balance_locked(created.id_typed(), dec!(-1))
            .await
            .unwrap();
    }
}
