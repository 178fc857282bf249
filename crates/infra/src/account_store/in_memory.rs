use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use gateway_accounts::Account;
use gateway_core::AccountId;

use super::r#trait::AccountStore;
use crate::error::{ACCOUNTS_PKEY, API_KEY_CONSTRAINT, StoreError};

/// Default bound on how long `update_balance_locked` waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One stored account.
///
/// `lock` plays the role of the row lock; `committed` is the last committed
/// state that unlocked readers observe.
#[derive(Debug)]
struct Row {
    lock: Arc<Mutex<()>>,
    committed: RwLock<Account>,
}

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<AccountId, Arc<Row>>,
    by_api_key: HashMap<String, AccountId>,
}

/// In-memory account store with per-row locking.
///
/// Intended for tests/dev. Honours the same contract as the Postgres store:
/// unique API keys, non-blocking reads, and an exclusive lock per account for
/// balance updates (different accounts never contend).
#[derive(Debug)]
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
    lock_timeout: Duration,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            lock_timeout,
        }
    }

    fn row(&self, id: AccountId) -> Result<Arc<Row>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::poisoned())?;
        tables.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn snapshot(row: &Row) -> Result<Account, StoreError> {
        row.committed
            .read()
            .map(|a| a.clone())
            .map_err(|_| StoreError::poisoned())
    }

    /// Acquire the row lock of an account, honouring the lock timeout.
    async fn acquire(&self, row: &Row) -> Result<OwnedMutexGuard<()>, StoreError> {
        tokio::time::timeout(self.lock_timeout, row.lock.clone().lock_owned())
            .await
            .map_err(|_| {
                StoreError::LockTimeout(format!(
                    "row lock not acquired within {}ms",
                    self.lock_timeout.as_millis()
                ))
            })
    }

    /// Hold an account's row lock, as a concurrent transaction would.
    #[cfg(test)]
    pub(crate) async fn hold_row_lock(&self, id: AccountId) -> OwnedMutexGuard<()> {
        let row = self.row(id).expect("account exists");
        row.lock.clone().lock_owned().await
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::poisoned())?;

        if tables.by_api_key.contains_key(account.api_key()) {
            return Err(StoreError::duplicate(
                API_KEY_CONSTRAINT,
                format!("api_key '{}' already exists", account.api_key()),
            ));
        }
        if tables.by_id.contains_key(&account.id_typed()) {
            return Err(StoreError::duplicate(
                ACCOUNTS_PKEY,
                format!("id '{}' already exists", account.id_typed()),
            ));
        }

        let row = Row {
            lock: Arc::new(Mutex::new(())),
            committed: RwLock::new(account.clone()),
        };
        tables
            .by_api_key
            .insert(account.api_key().to_string(), account.id_typed());
        tables.by_id.insert(account.id_typed(), Arc::new(row));

        Ok(())
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Account, StoreError> {
        let row = {
            let tables = self.tables.read().map_err(|_| StoreError::poisoned())?;
            let id = tables.by_api_key.get(api_key).ok_or(StoreError::NotFound)?;
            tables.by_id.get(id).cloned().ok_or(StoreError::NotFound)?
        };
        Self::snapshot(&row)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
        let row = self.row(id)?;
        Self::snapshot(&row)
    }

    async fn update_balance_locked(&self, id: AccountId, amount: Decimal) -> Result<Account, StoreError> {
        let row = self.row(id)?;
        let _guard = self.acquire(&row).await?;

        // Re-read inside the lock; the delta is applied to this value only.
        // A rejected delta returns before the committed state is touched.
        let mut account = Self::snapshot(&row)?;
        account.add_balance(amount).map_err(StoreError::Rejected)?;
        account.touch(Utc::now());

        let mut committed = row.committed.write().map_err(|_| StoreError::poisoned())?;
        *committed = account.clone();

        Ok(account)
    }
}
