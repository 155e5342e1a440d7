//! Store-level error model.

use thiserror::Error;

use catalog_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a catalog store operation.
///
/// Absence is not a failure: lookups return `Ok(None)` and deletes of
/// missing records return `Ok(false)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The submitted data was rejected by the domain (validation, invariant,
    /// stale revision).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A referenced record does not exist, or a write would orphan one.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The backing store failed (connection, poisoned lock, ...).
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_validation())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Domain(DomainError::Conflict(_)))
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}
