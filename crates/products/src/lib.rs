//! Catalog domain module.
//!
//! Brands, categories, products, their media, variations and price rows,
//! implemented as deterministic domain logic (no IO, no storage).

pub mod detail;
pub mod media;
pub mod pricing;
pub mod product;
pub mod reference;
pub mod validate;
pub mod variation;

pub use detail::{PriceDetail, PrimaryVideo, ProductDetail, VariationDetail, VideoEntry};
pub use media::{ImageDraft, ImageRef, ProductImage, ProductImageId, ProductVideo, ProductVideoId, VideoDraft, VideoLink};
pub use pricing::{
    PriceAttribute, PriceDraft, ProductPrice, ProductPriceId, discount_is_active, effective_price,
    ensure_attribute_subset,
};
pub use product::{Product, ProductDraft, ProductId, normalize_tags};
pub use reference::{
    Attribute, AttributeId, Brand, BrandId, Category, CategoryId, Color, ColorId, HexColor, Reference,
    ReferenceKind, VideoProvider, VideoProviderId,
};
pub use variation::{Attached, ProductVariation, ProductVariationId, VariationAttribute, VariationColor, VariationDraft};
