use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use gateway_accounts::Account;
use gateway_core::AccountId;

use crate::error::StoreError;

/// Durable keyed storage of accounts.
///
/// ## Lookups
///
/// `find_by_api_key()` and `find_by_id()` are plain reads. They take no lock and
/// never wait on a concurrent balance update; they observe the last committed
/// state.
///
/// ## Locked update
///
/// `update_balance_locked()` runs as a single atomic unit that:
/// 1. acquires an exclusive lock on the account row (blocking other lockers of
///    the same row, never other rows)
/// 2. fails with `NotFound` if the row does not exist
/// 3. re-reads the balance while holding the lock and applies the signed delta
///    to that value
/// 4. writes the new balance with a refreshed `updated_at` and releases the lock
///
/// Any failure leaves the stored balance unchanged. Waiting for the lock is
/// bounded; on expiry the call fails with `StoreError::LockTimeout`.
///
/// ## Implementation Requirements
///
/// - `create()` must reject a second account with the same API key with
///   `StoreError::DuplicateKey`, even when two creates race
/// - no balance may be cached across calls
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account.
    async fn create(&self, account: &Account) -> Result<(), StoreError>;

    /// Load an account by API key.
    async fn find_by_api_key(&self, api_key: &str) -> Result<Account, StoreError>;

    /// Load an account by identifier.
    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Apply `amount` to the balance under an exclusive row lock and return the
    /// committed account.
    async fn update_balance_locked(&self, id: AccountId, amount: Decimal) -> Result<Account, StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        (**self).create(account).await
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Account, StoreError> {
        (**self).find_by_api_key(api_key).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn update_balance_locked(&self, id: AccountId, amount: Decimal) -> Result<Account, StoreError> {
        (**self).update_balance_locked(id, amount).await
    }
}
