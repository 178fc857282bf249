//! Store and service error types.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `DuplicateKey` | Insert clashing with a unique index, named by `constraint` |
//! | Database (lock not available) | `55P03` | `LockTimeout` | Row lock not acquired within `lock_timeout` |
//! | Database (other) | Any other | `Database` | Other database errors, including `57014` (statement cancelled) |
//! | PoolClosed | N/A | `PoolClosed` | Connection pool was closed |
//! | PoolTimedOut | N/A | `Database` | No connection available |
//! | ColumnDecode / Decode | N/A | `Decode` | Stored row does not match the model |
//! | Other | N/A | `Database` | Network errors, connection failures, etc. |
//!
//! `Rejected` never comes from the database: a store raises it when the domain
//! refuses a change (a balance leaving the money range) before anything is
//! written.

use thiserror::Error;

use gateway_core::DomainError;

/// Unique index on `accounts.api_key`.
pub const API_KEY_CONSTRAINT: &str = "accounts_api_key_key";
/// Primary key of `accounts`.
pub const ACCOUNTS_PKEY: &str = "accounts_pkey";
/// Primary key of `invoices`.
pub const INVOICES_PKEY: &str = "invoices_pkey";

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. `NotFound`,
/// `Rejected` and a `DuplicateKey` on the API key index are the only kinds the
/// services translate; everything else is propagated to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate key violates {constraint}: {detail}")]
    DuplicateKey { constraint: String, detail: String },

    #[error("change rejected: {0}")]
    Rejected(DomainError),

    #[error("lock timeout: {0}")]
    LockTimeout(String),

    #[error("connection pool closed in {0}")]
    PoolClosed(String),

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn poisoned() -> Self {
        Self::Database("lock poisoned".to_string())
    }

    pub fn duplicate(constraint: &str, detail: impl Into<String>) -> Self {
        Self::DuplicateKey {
            constraint: constraint.to_string(),
            detail: detail.into(),
        }
    }
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            classify_database_error(db_err.code().as_deref(), db_err.constraint(), msg)
        }
        sqlx::Error::PoolClosed => StoreError::PoolClosed(operation.to_string()),
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Map a Postgres SQLSTATE (and violated constraint, if any) to a store error.
fn classify_database_error(code: Option<&str>, constraint: Option<&str>, msg: String) -> StoreError {
    match code {
        Some("23505") => StoreError::DuplicateKey {
            constraint: constraint.unwrap_or_default().to_string(),
            detail: msg,
        },
        Some("55P03") => StoreError::LockTimeout(msg),
        _ => StoreError::Database(msg),
    }
}

/// Outcome of a ledger or invoice service call that did not succeed.
///
/// `Domain` carries the typed business outcome; `Store` carries the original
/// infrastructure failure untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    /// Translate an account-store failure into the ledger vocabulary.
    pub fn from_account_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::Domain(DomainError::AccountNotFound),
            StoreError::DuplicateKey { constraint, .. } if constraint == API_KEY_CONSTRAINT => {
                Self::Domain(DomainError::DuplicateAccount)
            }
            StoreError::Rejected(err) => Self::Domain(err),
            other => Self::Store(other),
        }
    }

    /// Translate an invoice-store failure into the ledger vocabulary.
    pub fn from_invoice_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::Domain(DomainError::InvoiceNotFound),
            StoreError::Rejected(err) => Self::Domain(err),
            other => Self::Store(other),
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Store(_) => None,
        }
    }
}
