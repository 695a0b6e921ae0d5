//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure surfaced by a workflow carries one of these kinds together
/// with its reason. Kinds are never collapsed into a generic error: callers
/// branch on them to decide between "fix the request" and "retry later".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input or a business rule violation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A decrement would take an inventory quantity below zero.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// The caller lacks the access level or ownership for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A disallowed state transition or a concurrent-write conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient storage failure; the same request may succeed later.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Validation(_) => "validation_error",
            DomainError::InsufficientStock(_) => "insufficient_stock",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Conflict(_) => "conflict",
            DomainError::ServiceUnavailable(_) => "service_unavailable",
            DomainError::InvalidId(_) => "invalid_id",
        }
    }

    /// Whether resubmitting the unchanged request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::ServiceUnavailable(_))
    }
}
