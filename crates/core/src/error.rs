//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lifecycle rules, balance rules, conflicts). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty description, non-positive quantity, bad dates).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command is not legal for the aggregate's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A bounded collection is already full.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// A referenced aggregate or child entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A payment would drive the outstanding balance below zero.
    #[error("overpayment: {0}")]
    Overpayment(String),

    /// Arithmetic was attempted across two different currencies.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// A concurrent write was detected (e.g. stale aggregate version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain invariant was violated (e.g. arithmetic overflow).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Fieldless discriminant of [`DomainError`], for callers that branch on the
/// kind of failure (e.g. to map it onto a transport status).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    Capacity,
    NotFound,
    Overpayment,
    CurrencyMismatch,
    Conflict,
    InvariantViolation,
    InvalidId,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Capacity => "capacity",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Overpayment => "overpayment",
            ErrorKind::CurrencyMismatch => "currency_mismatch",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::InvalidId => "invalid_id",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn overpayment(msg: impl Into<String>) -> Self {
        Self::Overpayment(msg.into())
    }

    pub fn currency_mismatch(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::CurrencyMismatch {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::InvalidState(_) => ErrorKind::InvalidState,
            DomainError::Capacity(_) => ErrorKind::Capacity,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Overpayment(_) => ErrorKind::Overpayment,
            DomainError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            DomainError::InvalidId(_) => ErrorKind::InvalidId,
        }
    }
}
