//! Stored catalog records: typed identity plus audit timestamps.

use uuid::Uuid;

use crate::value_object::Timestamps;

/// A record with its own identity that survives edits.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Into<Uuid>;

    fn id(&self) -> &Self::Id;

    /// When the record was created and last changed.
    fn recorded(&self) -> Timestamps;

    /// Untyped key, for surfaces that list several record kinds side by side.
    fn key(&self) -> Uuid {
        (*self.id()).into()
    }
}
