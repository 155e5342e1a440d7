//! Aggregate roots and revision checks for records edited through the admin.

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// An entity that owns other records and is revised as a whole.
///
/// A product owns its media, variations and prices; deleting the root removes
/// everything it owns. `version()` counts revisions of the root's own fields so
/// two admins editing the same record cannot silently overwrite each other.
pub trait AggregateRoot: Entity {
    /// Number of revisions applied since creation (a fresh record is at 1).
    fn version(&self) -> u64;
}

/// Revision a caller expects a record to be at when submitting an edit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Last write wins (seeding, imports).
    Any,
    /// Reject the edit unless the stored record is at exactly this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "record was modified concurrently (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_every_revision() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
    }

    #[test]
    fn exact_rejects_stale_revision() {
        assert!(ExpectedVersion::Exact(3).check(3).is_ok());
        match ExpectedVersion::Exact(2).check(3) {
            Err(DomainError::Conflict(msg)) => assert!(msg.contains("actual: 3")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
