//! Catalog storage boundary.
//!
//! `CatalogStore` is the one seam between the catalog domain and its
//! persistence. Implementations own referential integrity and the delete
//! cascades:
//!
//! | deleted | also removed |
//! |---|---|
//! | product | images, videos, variations (and everything they own) |
//! | variation | attribute/colour join rows, price rows |
//! | price row | its attribute join rows |
//! | category / brand | every product referencing it |
//! | video provider | every video referencing it |
//! | attribute / colour | the join rows referencing it |
//!
//! Each operation is atomic: a failed write leaves the store unchanged.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use catalog_core::ExpectedVersion;
use catalog_products::{
    Attached, AttributeId, BrandId, CategoryId, Color, ColorId, ImageDraft, PriceDraft, Product, ProductDetail,
    ProductDraft, ProductId, ProductImage, ProductImageId, ProductPrice, ProductPriceId, ProductVariation,
    ProductVariationId, ProductVideo, ProductVideoId, Reference, VariationDraft, VideoDraft,
};

use crate::error::StoreResult;
use crate::upsert::Upserted;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

/// Product list filter (the admin `list_filter` columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub tag: Option<String>,
}

impl ProductFilter {
    pub fn category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn brand(brand_id: BrandId) -> Self {
        Self {
            brand_id: Some(brand_id),
            ..Self::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.category_id.is_none_or(|c| product.category_id == c)
            && self.brand_id.is_none_or(|b| product.brand_id == b)
            && self.tag.as_deref().is_none_or(|t| product.has_tag(t))
    }
}

/// Persistence for the whole catalog.
///
/// Lookups of absent records return `Ok(None)`; deletes of absent records
/// return `Ok(false)`. Lists are in creation order.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- reference tables (brands, categories, video providers, attributes) ---

    async fn insert_reference<R: Reference>(&self, record: R) -> StoreResult<R>;

    async fn get_reference<R: Reference>(&self, id: R::Id) -> StoreResult<Option<R>>;

    async fn find_reference<R: Reference>(&self, name: &str) -> StoreResult<Option<R>>;

    async fn list_references<R: Reference>(&self) -> StoreResult<Vec<R>>;

    async fn rename_reference<R: Reference>(&self, id: R::Id, name: &str) -> StoreResult<Option<R>>;

    async fn delete_reference<R: Reference>(&self, id: R::Id) -> StoreResult<bool>;

    /// Get-or-create by exact name.
    async fn upsert_reference<R: Reference>(&self, name: &str) -> StoreResult<Upserted<R>> {
        if let Some(existing) = self.find_reference::<R>(name.trim()).await? {
            return Ok(Upserted::Existing(existing));
        }
        let record = R::create(name, chrono::Utc::now())?;
        Ok(Upserted::Created(self.insert_reference(record).await?))
    }

    // --- colours ---

    async fn insert_color(&self, color: Color) -> StoreResult<Color>;

    async fn get_color(&self, id: ColorId) -> StoreResult<Option<Color>>;

    async fn list_colors(&self) -> StoreResult<Vec<Color>>;

    async fn delete_color(&self, id: ColorId) -> StoreResult<bool>;

    /// Get-or-create by name; an existing colour keeps its stored code.
    async fn upsert_color(&self, name: &str, color_code: &str) -> StoreResult<Upserted<Color>> {
        let name = name.trim();
        let colors = self.list_colors().await?;
        if let Some(existing) = colors.into_iter().find(|c| c.name == name) {
            return Ok(Upserted::Existing(existing));
        }
        let color = Color::new(name, color_code, chrono::Utc::now())?;
        Ok(Upserted::Created(self.insert_color(color).await?))
    }

    // --- products ---

    /// Create a product. Its category and brand must exist.
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product>;

    /// Replace a product's fields, checking its revision. `Ok(None)` if absent.
    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
        expected: ExpectedVersion,
    ) -> StoreResult<Option<Product>>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    /// The product with its references and every record it owns.
    async fn load_product_detail(&self, id: ProductId) -> StoreResult<Option<ProductDetail>>;

    async fn list_product_details(&self, filter: &ProductFilter) -> StoreResult<Vec<ProductDetail>> {
        let products = self.list_products(filter).await?;
        let mut details = Vec::with_capacity(products.len());
        for product in products {
            if let Some(detail) = self.load_product_detail(product.id).await? {
                details.push(detail);
            }
        }
        Ok(details)
    }

    /// Get-or-create by (name, category, brand).
    async fn upsert_product(&self, draft: ProductDraft) -> StoreResult<Upserted<Product>> {
        let filter = ProductFilter {
            category_id: Some(draft.category_id),
            brand_id: Some(draft.brand_id),
            tag: None,
        };
        let name = draft.name.trim().to_string();
        let candidates = self.list_products(&filter).await?;
        if let Some(existing) = candidates.into_iter().find(|p| p.name == name) {
            return Ok(Upserted::Existing(existing));
        }
        Ok(Upserted::Created(self.create_product(draft).await?))
    }

    // --- images ---

    /// Add an image. A second thumbnail for the same product is rejected.
    async fn add_image(&self, draft: ImageDraft) -> StoreResult<ProductImage>;

    async fn list_images(&self, product_id: ProductId) -> StoreResult<Vec<ProductImage>>;

    /// Make `image_id` the product's only thumbnail. `Ok(false)` if the image
    /// does not belong to the product.
    async fn set_thumbnail(&self, product_id: ProductId, image_id: ProductImageId) -> StoreResult<bool>;

    async fn delete_image(&self, id: ProductImageId) -> StoreResult<bool>;

    /// Get-or-create by (product, image reference).
    async fn upsert_image(&self, draft: ImageDraft) -> StoreResult<Upserted<ProductImage>> {
        let wanted = draft.image.trim().to_string();
        let images = self.list_images(draft.product_id).await?;
        if let Some(existing) = images.into_iter().find(|i| i.image.as_str() == wanted) {
            return Ok(Upserted::Existing(existing));
        }
        Ok(Upserted::Created(self.add_image(draft).await?))
    }

    // --- videos ---

    async fn add_video(&self, draft: VideoDraft) -> StoreResult<ProductVideo>;

    async fn list_videos(&self, product_id: ProductId) -> StoreResult<Vec<ProductVideo>>;

    async fn delete_video(&self, id: ProductVideoId) -> StoreResult<bool>;

    /// Get-or-create by (product, provider, link).
    async fn upsert_video(&self, draft: VideoDraft) -> StoreResult<Upserted<ProductVideo>> {
        let wanted = draft
            .video_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let videos = self.list_videos(draft.product_id).await?;
        let existing = videos.into_iter().find(|v| {
            v.provider_id == draft.provider_id
                && v.video_link.as_ref().map(|l| l.as_str()) == wanted.as_deref()
        });
        if let Some(existing) = existing {
            return Ok(Upserted::Existing(existing));
        }
        Ok(Upserted::Created(self.add_video(draft).await?))
    }

    // --- variations ---

    /// Create a variation together with its attribute and colour selections.
    async fn add_variation(&self, draft: VariationDraft) -> StoreResult<ProductVariation>;

    async fn list_variations(&self, product_id: ProductId) -> StoreResult<Vec<ProductVariation>>;

    async fn attach_attribute(&self, variation_id: ProductVariationId, attribute_id: AttributeId)
    -> StoreResult<Attached>;

    /// Remove an attribute from a variation. Rejected while one of the
    /// variation's price rows is narrowed by it.
    async fn detach_attribute(&self, variation_id: ProductVariationId, attribute_id: AttributeId)
    -> StoreResult<bool>;

    async fn attach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<Attached>;

    async fn detach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<bool>;

    async fn delete_variation(&self, id: ProductVariationId) -> StoreResult<bool>;

    // --- prices ---

    /// Create a price row. Its attributes must be a subset of the variation's.
    async fn add_price(&self, draft: PriceDraft) -> StoreResult<ProductPrice>;

    async fn list_prices(&self, variation_id: ProductVariationId) -> StoreResult<Vec<ProductPrice>>;

    async fn delete_price(&self, id: ProductPriceId) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(tags: &[&str]) -> Product {
        let mut draft = ProductDraft::new("Smartphone", CategoryId::new(), BrandId::new(), Decimal::from(10));
        draft.tags = tags.iter().map(|t| t.to_string()).collect();
        Product::create(ProductId::new(), draft, Utc::now()).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(ProductFilter::default().matches(&product(&[])));
    }

    #[test]
    fn filter_by_tag_and_brand() {
        let p = product(&["sale", "new"]);
        assert!(ProductFilter::tag("sale").matches(&p));
        assert!(!ProductFilter::tag("clearance").matches(&p));
        assert!(ProductFilter::brand(p.brand_id).matches(&p));
        assert!(!ProductFilter::brand(BrandId::new()).matches(&p));
        assert!(!ProductFilter::category(CategoryId::new()).matches(&p));
    }
}
