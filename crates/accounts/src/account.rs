use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gateway_core::money::{checked_sum, validate_amount};
use gateway_core::{AccountId, DomainResult, Entity};

/// Generate a fresh API key: 32 lowercase hex characters.
pub fn generate_api_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Input for opening an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    /// Caller-chosen key. A missing or blank key is replaced by a generated one.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub balance: Decimal,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            api_key: None,
            balance: Decimal::ZERO,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }
}

/// A monetary account.
///
/// Instances are transient copies of the stored record. The balance is only
/// changed by the store's locked update path, which calls [`Account::add_balance`]
/// on the copy it read while holding the row lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    name: String,
    email: String,
    api_key: String,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a not-yet-persisted account from creation input.
    ///
    /// The opening balance must fit the stored money shape (see
    /// [`gateway_core::money`]).
    pub fn open(input: NewAccount, now: DateTime<Utc>) -> DomainResult<Self> {
        let balance = validate_amount(input.balance)?;
        let api_key = match input.api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => generate_api_key(),
        };

        Ok(Self {
            id: AccountId::new(),
            name: input.name,
            email: input.email,
            api_key,
            balance,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild an account from its stored representation.
    pub fn restore(
        id: AccountId,
        name: String,
        email: String,
        api_key: String,
        balance: Decimal,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            api_key,
            balance,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a signed delta (positive credits, negative debits).
    ///
    /// There is no floor: the balance may go negative. A delta that does not
    /// fit the money shape, or a result outside the stored range, is rejected
    /// and leaves the balance untouched.
    pub fn add_balance(&mut self, amount: Decimal) -> DomainResult<()> {
        let amount = validate_amount(amount)?;
        self.balance = checked_sum(self.balance, amount)?;
        Ok(())
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Externally visible projection of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOutput {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub api_key: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountOutput {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            api_key: account.api_key.clone(),
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<Account> for AccountOutput {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            api_key: account.api_key,
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
