//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// This is the typed vocabulary callers map to their own representation
/// (HTTP status codes, CLI exit codes). Infrastructure failures are never
/// folded into it; they travel alongside as store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No account matches the lookup key, or it vanished before the locked update.
    #[error("account not found")]
    AccountNotFound,

    /// An account with the same API key already exists.
    #[error("api key already exists")]
    DuplicateAccount,

    /// No invoice matches the identifier.
    #[error("invoice not found")]
    InvoiceNotFound,

    /// The caller's account does not own the requested resource.
    #[error("unauthorized access")]
    UnauthorizedAccess,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A lifecycle transition is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
