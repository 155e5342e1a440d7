/// Result of an idempotent create keyed by a natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted<T> {
    Created(T),
    Existing(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn record(&self) -> &T {
        match self {
            Upserted::Created(r) | Upserted::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Upserted::Created(r) | Upserted::Existing(r) => r,
        }
    }

    /// `(record, was_created)`.
    pub fn into_parts(self) -> (T, bool) {
        let created = self.was_created();
        (self.into_record(), created)
    }
}
