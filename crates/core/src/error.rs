//! Errors raised while building or changing catalog records.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why a catalog record was rejected.
///
/// Only failures decidable from the record itself (or its parent) live here.
/// Dangling references and backend failures are reported by the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field value is missing, too long, out of range or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The change would break a rule spanning several records, such as a
    /// second thumbnail on one product.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Text could not be parsed as a record identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The record already exists, or was edited since it was read.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// True when resubmitting different data could succeed.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Invariant(_))
    }
}
