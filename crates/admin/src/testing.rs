//! Store double for exercising load-failure paths.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use catalog_core::ExpectedVersion;
use catalog_infra::{CatalogStore, InMemoryCatalogStore, ProductFilter, StoreError, StoreResult};
use catalog_products::{
    Attached, AttributeId, Color, ColorId, ImageDraft, PriceDraft, Product, ProductDetail, ProductDraft, ProductId,
    ProductImage, ProductImageId, ProductPrice, ProductPriceId, ProductVariation, ProductVariationId, ProductVideo,
    ProductVideoId, Reference, VariationDraft, VideoDraft,
};

/// In-memory store whose `load_product_detail` fails for chosen products.
pub(crate) struct FlakyDetailStore {
    pub(crate) inner: InMemoryCatalogStore,
    broken: Mutex<HashSet<ProductId>>,
}

impl FlakyDetailStore {
    pub(crate) fn new(inner: InMemoryCatalogStore) -> Self {
        Self {
            inner,
            broken: Mutex::default(),
        }
    }

    pub(crate) fn break_detail(&self, id: ProductId) {
        self.broken.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl CatalogStore for FlakyDetailStore {
    async fn insert_reference<R: Reference>(&self, record: R) -> StoreResult<R> {
        self.inner.insert_reference(record).await
    }

    async fn get_reference<R: Reference>(&self, id: R::Id) -> StoreResult<Option<R>> {
        self.inner.get_reference::<R>(id).await
    }

    async fn find_reference<R: Reference>(&self, name: &str) -> StoreResult<Option<R>> {
        self.inner.find_reference::<R>(name).await
    }

    async fn list_references<R: Reference>(&self) -> StoreResult<Vec<R>> {
        self.inner.list_references::<R>().await
    }

    async fn rename_reference<R: Reference>(&self, id: R::Id, name: &str) -> StoreResult<Option<R>> {
        self.inner.rename_reference::<R>(id, name).await
    }

    async fn delete_reference<R: Reference>(&self, id: R::Id) -> StoreResult<bool> {
        self.inner.delete_reference::<R>(id).await
    }

    async fn insert_color(&self, color: Color) -> StoreResult<Color> {
        self.inner.insert_color(color).await
    }

    async fn get_color(&self, id: ColorId) -> StoreResult<Option<Color>> {
        self.inner.get_color(id).await
    }

    async fn list_colors(&self) -> StoreResult<Vec<Color>> {
        self.inner.list_colors().await
    }

    async fn delete_color(&self, id: ColorId) -> StoreResult<bool> {
        self.inner.delete_color(id).await
    }

    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        self.inner.create_product(draft).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
        expected: ExpectedVersion,
    ) -> StoreResult<Option<Product>> {
        self.inner.update_product(id, draft, expected).await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.inner.get_product(id).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.inner.list_products(filter).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        self.inner.delete_product(id).await
    }

    async fn load_product_detail(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        if self.broken.lock().unwrap().contains(&id) {
            return Err(StoreError::backend("connection reset by peer"));
        }
        self.inner.load_product_detail(id).await
    }

    async fn add_image(&self, draft: ImageDraft) -> StoreResult<ProductImage> {
        self.inner.add_image(draft).await
    }

    async fn list_images(&self, product_id: ProductId) -> StoreResult<Vec<ProductImage>> {
        self.inner.list_images(product_id).await
    }

    async fn set_thumbnail(&self, product_id: ProductId, image_id: ProductImageId) -> StoreResult<bool> {
        self.inner.set_thumbnail(product_id, image_id).await
    }

    async fn delete_image(&self, id: ProductImageId) -> StoreResult<bool> {
        self.inner.delete_image(id).await
    }

    async fn add_video(&self, draft: VideoDraft) -> StoreResult<ProductVideo> {
        self.inner.add_video(draft).await
    }

    async fn list_videos(&self, product_id: ProductId) -> StoreResult<Vec<ProductVideo>> {
        self.inner.list_videos(product_id).await
    }

    async fn delete_video(&self, id: ProductVideoId) -> StoreResult<bool> {
        self.inner.delete_video(id).await
    }

    async fn add_variation(&self, draft: VariationDraft) -> StoreResult<ProductVariation> {
        self.inner.add_variation(draft).await
    }

    async fn list_variations(&self, product_id: ProductId) -> StoreResult<Vec<ProductVariation>> {
        self.inner.list_variations(product_id).await
    }

    async fn attach_attribute(
        &self,
        variation_id: ProductVariationId,
        attribute_id: AttributeId,
    ) -> StoreResult<Attached> {
        self.inner.attach_attribute(variation_id, attribute_id).await
    }

    async fn detach_attribute(&self, variation_id: ProductVariationId, attribute_id: AttributeId) -> StoreResult<bool> {
        self.inner.detach_attribute(variation_id, attribute_id).await
    }

    async fn attach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<Attached> {
        self.inner.attach_color(variation_id, color_id).await
    }

    async fn detach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<bool> {
        self.inner.detach_color(variation_id, color_id).await
    }

    async fn delete_variation(&self, id: ProductVariationId) -> StoreResult<bool> {
        self.inner.delete_variation(id).await
    }

    async fn add_price(&self, draft: PriceDraft) -> StoreResult<ProductPrice> {
        self.inner.add_price(draft).await
    }

    async fn list_prices(&self, variation_id: ProductVariationId) -> StoreResult<Vec<ProductPrice>> {
        self.inner.list_prices(variation_id).await
    }

    async fn delete_price(&self, id: ProductPriceId) -> StoreResult<bool> {
        self.inner.delete_price(id).await
    }
}
