//! Account ledger service.
//!
//! The only component that drives the account lifecycle. It composes store
//! operations into two protocols:
//!
//! - **create**: pre-check the API key, insert, and report a racing insert that
//!   trips the unique index as the same `DuplicateAccount` outcome
//! - **update balance**: resolve the account by API key (unlocked), then hand
//!   the signed delta to the store's locked update, which applies it to the
//!   balance it reads under the row lock
//!
//! No balances are cached here; every call re-fetches from the store.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use gateway_accounts::{Account, AccountOutput, NewAccount};
use gateway_core::{AccountId, DomainError};

use crate::account_store::AccountStore;
use crate::error::{ServiceError, StoreError};

pub struct LedgerService<S> {
    store: S,
}

impl<S> LedgerService<S>
where
    S: AccountStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new account, rejecting a duplicate API key.
    #[instrument(skip(self, input), fields(account_id = tracing::field::Empty), err)]
    pub async fn create_account(&self, input: NewAccount) -> Result<AccountOutput, ServiceError> {
        let account = Account::open(input, Utc::now())?;
        tracing::Span::current().record("account_id", tracing::field::display(account.id_typed()));

        match self.store.find_by_api_key(account.api_key()).await {
            Ok(_) => return Err(DomainError::DuplicateAccount.into()),
            Err(StoreError::NotFound) => {}
            Err(other) => return Err(ServiceError::Store(other)),
        }

        self.store
            .create(&account)
            .await
            .map_err(ServiceError::from_account_store)?;

        info!(account_id = %account.id_typed(), "account created");
        Ok(AccountOutput::from(account))
    }

    /// Credit (positive `amount`) or debit (negative `amount`) an account.
    #[instrument(skip(self, api_key), fields(amount = %amount), err)]
    pub async fn update_balance(&self, api_key: &str, amount: Decimal) -> Result<AccountOutput, ServiceError> {
        let account = self
            .store
            .find_by_api_key(api_key)
            .await
            .map_err(ServiceError::from_account_store)?;

        let updated = self
            .store
            .update_balance_locked(account.id_typed(), amount)
            .await
            .map_err(ServiceError::from_account_store)?;

        debug!(
            account_id = %updated.id_typed(),
            balance = %updated.balance(),
            "balance updated"
        );
        Ok(AccountOutput::from(updated))
    }

    pub async fn find_by_api_key(&self, api_key: &str) -> Result<AccountOutput, ServiceError> {
        self.store
            .find_by_api_key(api_key)
            .await
            .map(AccountOutput::from)
            .map_err(ServiceError::from_account_store)
    }

    pub async fn find_by_id(&self, id: AccountId) -> Result<AccountOutput, ServiceError> {
        self.store
            .find_by_id(id)
            .await
            .map(AccountOutput::from)
            .map_err(ServiceError::from_account_store)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use gateway_core::money::max_amount;

    use super::*;
    use crate::account_store::InMemoryAccountStore;

    fn alice(balance: Decimal) -> NewAccount {
        NewAccount::new("Alice", "a@x.com")
            .with_api_key("K1")
            .with_balance(balance)
    }

    #[tokio::test]
    async fn duplicate_api_key_is_rejected() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());
        ledger.create_account(alice(dec!(0))).await.unwrap();

        let err = ledger.create_account(alice(dec!(0))).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::DuplicateAccount));
    }

    #[tokio::test]
    async fn lookups_return_creation_fields() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());
        let created = ledger.create_account(alice(dec!(100))).await.unwrap();

        let by_key = ledger.find_by_api_key("K1").await.unwrap();
        let by_id = ledger.find_by_id(created.id).await.unwrap();

        assert_eq!(by_key, created);
        assert_eq!(by_id, created);
        assert_eq!(by_key.name, "Alice");
        assert_eq!(by_key.email, "a@x.com");
        assert_eq!(by_key.balance, dec!(100));
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());
        ledger.create_account(alice(dec!(7))).await.unwrap();

        let first = ledger.find_by_api_key("K1").await.unwrap();
        let second = ledger.find_by_api_key("K1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn sequential_updates_credit_then_debit() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());
        ledger.create_account(alice(dec!(100))).await.unwrap();

        let after_credit = ledger.update_balance("K1", dec!(50)).await.unwrap();
        assert_eq!(after_credit.balance, dec!(150));

        let after_debit = ledger.update_balance("K1", dec!(-30)).await.unwrap();
        assert_eq!(after_debit.balance, dec!(120));
        assert!(after_debit.updated_at >= after_credit.updated_at);
    }

    #[tokio::test]
    async fn update_past_the_money_range_is_rejected_and_leaves_balance() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());
        ledger.create_account(alice(max_amount())).await.unwrap();

        let err = ledger.update_balance("K1", Decimal::ONE).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::validation("balance overflow")));

        let err = ledger.update_balance("K1", Decimal::MAX).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        assert_eq!(ledger.find_by_api_key("K1").await.unwrap().balance, max_amount());
        let after_debit = ledger.update_balance("K1", dec!(-1)).await.unwrap();
        assert_eq!(after_debit.balance, max_amount() - Decimal::ONE);
    }

    #[tokio::test]
    async fn sub_cent_fractions_beyond_four_places_are_rejected() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());

        let err = ledger.create_account(alice(dec!(1.00005))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert!(ledger.find_by_api_key("K1").await.is_err());

        ledger.create_account(alice(dec!(1.0001))).await.unwrap();
        let err = ledger.update_balance("K1", dec!(0.00001)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(ledger.find_by_api_key("K1").await.unwrap().balance, dec!(1.0001));
    }

    #[tokio::test]
    async fn update_of_unknown_key_is_account_not_found() {
        let ledger = LedgerService::new(InMemoryAccountStore::new());

        let err = ledger.update_balance("UNKNOWN_KEY", dec!(10)).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::AccountNotFound));
        assert_eq!(
            ledger.find_by_api_key("UNKNOWN_KEY").await.unwrap_err(),
            ServiceError::Domain(DomainError::AccountNotFound)
        );
    }

    /// Store double that scripts failures around the real in-memory store.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryAccountStore,
        lookup_error: Mutex<Option<StoreError>>,
        hide_on_lookup: bool,
        vanish_before_update: bool,
    }

    #[async_trait]
    impl AccountStore for ScriptedStore {
        async fn create(&self, account: &Account) -> Result<(), StoreError> {
            self.inner.create(account).await
        }

        async fn find_by_api_key(&self, api_key: &str) -> Result<Account, StoreError> {
            let scripted = self.lookup_error.lock().unwrap().take();
            if let Some(err) = scripted {
                return Err(err);
            }
            if self.hide_on_lookup {
                return Err(StoreError::NotFound);
            }
            self.inner.find_by_api_key(api_key).await
        }

        async fn find_by_id(&self, id: AccountId) -> Result<Account, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn update_balance_locked(&self, id: AccountId, amount: Decimal) -> Result<Account, StoreError> {
            if self.vanish_before_update {
                return Err(StoreError::NotFound);
            }
            self.inner.update_balance_locked(id, amount).await
        }
    }

    #[tokio::test]
    async fn infrastructure_failure_during_pre_check_propagates_unchanged() {
        let store = ScriptedStore::default();
        *store.lookup_error.lock().unwrap() = Some(StoreError::Database("connection reset".into()));
        let ledger = LedgerService::new(store);

        let err = ledger.create_account(alice(dec!(0))).await.unwrap_err();
        assert_eq!(err, ServiceError::Store(StoreError::Database("connection reset".into())));
    }

    #[tokio::test]
    async fn racing_insert_caught_by_store_is_duplicate_account() {
        // The pre-check sees nothing, but the store already holds the key.
        let store = ScriptedStore {
            hide_on_lookup: true,
            ..ScriptedStore::default()
        };
        let ledger = LedgerService::new(store);
        ledger.create_account(alice(dec!(0))).await.unwrap();

        let err = ledger.create_account(alice(dec!(0))).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::DuplicateAccount));
    }

    #[tokio::test]
    async fn row_vanishing_before_lock_is_account_not_found() {
        let store = ScriptedStore {
            vanish_before_update: true,
            ..ScriptedStore::default()
        };
        let ledger = LedgerService::new(store);
        ledger.create_account(alice(dec!(0))).await.unwrap();

        let err = ledger.update_balance("K1", dec!(5)).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::AccountNotFound));
    }

    #[tokio::test]
    async fn lock_timeout_is_surfaced_not_retried() {
        let store = InMemoryAccountStore::with_lock_timeout(std::time::Duration::from_millis(30));
        let ledger = LedgerService::new(store);
        let created = ledger.create_account(alice(dec!(1))).await.unwrap();

        let _held = ledger.store().hold_row_lock(created.id).await;
        let err = ledger.update_balance("K1", dec!(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::LockTimeout(_))));
        assert_eq!(ledger.find_by_api_key("K1").await.unwrap().balance, dec!(1));
    }
}
