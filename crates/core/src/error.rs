//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lifecycle rules, balance rules). Infrastructure concerns belong elsewhere
/// and are mapped into `Internal` at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (caller's fault, no mutation occurs).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting identity lacks the required capability or ownership.
    #[error("permission denied")]
    PermissionDenied,

    /// A requested resource (listing, user, swap) does not exist.
    #[error("not found")]
    NotFound,

    /// A lifecycle rule was violated; state is left untouched.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A ledger debit would leave the balance negative.
    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: u64, requested: u64 },

    /// A concurrent write won the race (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
