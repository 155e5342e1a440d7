//! Infrastructure layer: catalog stores, seeding and configuration.

pub mod config;
pub mod error;
pub mod seed;
pub mod store;
pub mod upsert;

pub use config::{CatalogConfig, ConfigError, LogFormat, StoreBackend};
pub use error::{StoreError, StoreResult};
pub use seed::{SeedReport, seed_demo_catalog};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, ProductFilter};
pub use upsert::Upserted;
