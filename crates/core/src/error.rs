//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// transport concerns belong elsewhere.
///
/// `NotFound` is deliberately used both for records that do not exist and for
/// records the caller is not allowed to see; callers cannot tell the two apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No acting user was present on the request.
    #[error("unauthorized")]
    Unauthorized,

    /// The record does not exist, or the acting user may not see it.
    #[error("not found")]
    NotFound,

    /// The acting user may see the record but not perform this mutation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The source record is not in a status that permits the operation.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (stale permission token, duplicate document, ...).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable machine-readable code, used by the HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Unauthorized => "unauthorized",
            DomainError::NotFound => "not_found",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::PreconditionFailed(_) => "precondition_failed",
            DomainError::Validation(_) => "validation_failed",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::Conflict(_) => "conflict",
        }
    }
}
