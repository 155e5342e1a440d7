//! `catalog-core`: identifiers, record traits and the domain error shared by every catalog crate.
//!
//! This crate contains **pure domain** primitives shared by every catalog crate
//! (no storage, no presentation concerns).

extern crate self as catalog_core;

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use value_object::{Timestamps, ValueObject};

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use uuid;
}
