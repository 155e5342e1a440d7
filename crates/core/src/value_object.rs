//! Value objects: equality by value, not identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two with the same values are the same
/// value (a hex colour code, a discount percentage, a pair of audit timestamps).
/// They are immutable; to "change" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Creation and last-modification instants of a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps for a record created at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with `updated_at` moved to `now` (never earlier than `created_at`).
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            updated_at: now.max(self.created_at),
        }
    }
}

impl ValueObject for Timestamps {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn touched_keeps_creation_instant() {
        let t0 = Utc::now();
        let stamps = Timestamps::at(t0).touched(t0 + Duration::seconds(5));
        assert_eq!(stamps.created_at, t0);
        assert_eq!(stamps.updated_at, t0 + Duration::seconds(5));
    }

    #[test]
    fn touched_never_goes_backwards() {
        let t0 = Utc::now();
        let stamps = Timestamps::at(t0).touched(t0 - Duration::seconds(5));
        assert_eq!(stamps.updated_at, t0);
    }
}
