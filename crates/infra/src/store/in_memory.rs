use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use catalog_core::{ExpectedVersion, Timestamps};
use catalog_products::{
    Attached, Attribute, AttributeId, Brand, BrandId, Category, CategoryId, Color, ColorId, ImageDraft,
    PriceAttribute, PriceDetail, PriceDraft, Product, ProductDetail, ProductDraft, ProductId, ProductImage,
    ProductImageId, ProductPrice, ProductPriceId, ProductVariation, ProductVariationId, ProductVideo,
    ProductVideoId, Reference, ReferenceKind, VariationAttribute, VariationColor, VariationDetail, VariationDraft,
    VideoDraft, VideoEntry, VideoProvider, VideoProviderId, ensure_attribute_subset,
};

use super::{CatalogStore, ProductFilter};
use crate::error::{StoreError, StoreResult};

/// One row of a name-only reference table.
#[derive(Debug, Clone)]
struct LabelRow {
    kind: ReferenceKind,
    id: Uuid,
    name: String,
    timestamps: Timestamps,
}

impl LabelRow {
    fn from_record<R: Reference>(record: &R) -> Self {
        Self {
            kind: R::KIND,
            id: record.reference_id().into(),
            name: record.name().to_string(),
            timestamps: record.timestamps(),
        }
    }

    fn to_record<R: Reference>(&self) -> R {
        R::restore(<R::Id as From<Uuid>>::from(self.id), self.name.clone(), self.timestamps)
    }
}

#[derive(Debug, Default)]
struct Tables {
    labels: Vec<LabelRow>,
    colors: Vec<Color>,
    products: Vec<Product>,
    images: Vec<ProductImage>,
    videos: Vec<ProductVideo>,
    variations: Vec<ProductVariation>,
    variation_attributes: Vec<VariationAttribute>,
    variation_colors: Vec<VariationColor>,
    prices: Vec<ProductPrice>,
    price_attributes: Vec<PriceAttribute>,
}

impl Tables {
    fn label(&self, kind: ReferenceKind, id: Uuid) -> Option<&LabelRow> {
        self.labels.iter().find(|row| row.kind == kind && row.id == id)
    }

    fn reference<R: Reference>(&self, id: R::Id) -> Option<R> {
        self.label(R::KIND, id.into()).map(LabelRow::to_record)
    }

    fn require_label(&self, kind: ReferenceKind, id: Uuid) -> StoreResult<()> {
        match self.label(kind, id) {
            Some(_) => Ok(()),
            None => Err(StoreError::integrity(format!("{} {id} does not exist", kind.label()))),
        }
    }

    fn require_product(&self, id: ProductId) -> StoreResult<()> {
        if self.products.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(StoreError::integrity(format!("product {id} does not exist")))
        }
    }

    fn require_variation(&self, id: ProductVariationId) -> StoreResult<()> {
        if self.variations.iter().any(|v| v.id == id) {
            Ok(())
        } else {
            Err(StoreError::integrity(format!("variation {id} does not exist")))
        }
    }

    fn require_color(&self, id: ColorId) -> StoreResult<()> {
        if self.colors.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(StoreError::integrity(format!("color {id} does not exist")))
        }
    }

    fn variation_attribute_ids(&self, variation_id: ProductVariationId) -> Vec<AttributeId> {
        self.variation_attributes
            .iter()
            .filter(|va| va.variation_id == variation_id)
            .map(|va| va.attribute_id)
            .collect()
    }

    fn remove_price(&mut self, id: ProductPriceId) -> bool {
        let before = self.prices.len();
        self.prices.retain(|p| p.id != id);
        if self.prices.len() == before {
            return false;
        }
        self.price_attributes.retain(|pa| pa.price_id != id);
        true
    }

    fn remove_variation(&mut self, id: ProductVariationId) -> bool {
        let before = self.variations.len();
        self.variations.retain(|v| v.id != id);
        if self.variations.len() == before {
            return false;
        }
        self.variation_attributes.retain(|va| va.variation_id != id);
        self.variation_colors.retain(|vc| vc.variation_id != id);
        let prices: Vec<ProductPriceId> = self
            .prices
            .iter()
            .filter(|p| p.variation_id == id)
            .map(|p| p.id)
            .collect();
        for price_id in &prices {
            self.remove_price(*price_id);
        }
        debug!(variation_id = %id, prices = prices.len(), "variation removed with its price rows");
        true
    }

    fn remove_product(&mut self, id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        if self.products.len() == before {
            return false;
        }
        self.images.retain(|i| i.product_id != id);
        self.videos.retain(|v| v.product_id != id);
        let variations: Vec<ProductVariationId> = self
            .variations
            .iter()
            .filter(|v| v.product_id == id)
            .map(|v| v.id)
            .collect();
        for variation_id in &variations {
            self.remove_variation(*variation_id);
        }
        debug!(product_id = %id, variations = variations.len(), "product removed with its media and variations");
        true
    }

    fn remove_label(&mut self, kind: ReferenceKind, id: Uuid) -> bool {
        let before = self.labels.len();
        self.labels.retain(|row| !(row.kind == kind && row.id == id));
        if self.labels.len() == before {
            return false;
        }

        match kind {
            ReferenceKind::Brand | ReferenceKind::Category => {
                let products: Vec<ProductId> = self
                    .products
                    .iter()
                    .filter(|p| match kind {
                        ReferenceKind::Brand => p.brand_id == BrandId::from(id),
                        _ => p.category_id == CategoryId::from(id),
                    })
                    .map(|p| p.id)
                    .collect();
                for product_id in &products {
                    self.remove_product(*product_id);
                }
                debug!(kind = kind.label(), %id, products = products.len(), "reference removed with its products");
            }
            ReferenceKind::VideoProvider => {
                let provider_id = VideoProviderId::from(id);
                let before = self.videos.len();
                self.videos.retain(|v| v.provider_id != provider_id);
                debug!(%id, videos = before - self.videos.len(), "video provider removed with its videos");
            }
            ReferenceKind::Attribute => {
                let attribute_id = AttributeId::from(id);
                self.variation_attributes.retain(|va| va.attribute_id != attribute_id);
                self.price_attributes.retain(|pa| pa.attribute_id != attribute_id);
                debug!(%id, "attribute removed with its join rows");
            }
        }
        true
    }

    fn detail(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        let Some(product) = self.products.iter().find(|p| p.id == id).cloned() else {
            return Ok(None);
        };

        let category = self
            .reference::<Category>(product.category_id)
            .ok_or_else(|| StoreError::integrity(format!("product {id} references a missing category")))?;
        let brand = self
            .reference::<Brand>(product.brand_id)
            .ok_or_else(|| StoreError::integrity(format!("product {id} references a missing brand")))?;

        let images = self.images.iter().filter(|i| i.product_id == id).cloned().collect();

        let mut videos = Vec::new();
        for video in self.videos.iter().filter(|v| v.product_id == id) {
            let provider = self.reference::<VideoProvider>(video.provider_id).ok_or_else(|| {
                StoreError::integrity(format!("video {} references a missing provider", video.id))
            })?;
            videos.push(VideoEntry {
                video: video.clone(),
                provider,
            });
        }

        let variations = self
            .variations
            .iter()
            .filter(|v| v.product_id == id)
            .map(|v| self.variation_detail(v))
            .collect();

        Ok(Some(ProductDetail {
            product,
            category,
            brand,
            images,
            videos,
            variations,
        }))
    }

    fn variation_detail(&self, variation: &ProductVariation) -> VariationDetail {
        let attributes = self
            .variation_attributes
            .iter()
            .filter(|va| va.variation_id == variation.id)
            .filter_map(|va| self.reference::<Attribute>(va.attribute_id))
            .collect();
        let colors = self
            .variation_colors
            .iter()
            .filter(|vc| vc.variation_id == variation.id)
            .filter_map(|vc| self.colors.iter().find(|c| c.id == vc.color_id).cloned())
            .collect();
        let prices = self
            .prices
            .iter()
            .filter(|p| p.variation_id == variation.id)
            .map(|price| PriceDetail {
                price: price.clone(),
                attributes: self
                    .price_attributes
                    .iter()
                    .filter(|pa| pa.price_id == price.id)
                    .filter_map(|pa| self.reference::<Attribute>(pa.attribute_id))
                    .collect(),
            })
            .collect();
        VariationDetail {
            variation: variation.clone(),
            attributes,
            colors,
            prices,
        }
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. All tables sit behind one lock, so every operation
/// (cascades included) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_reference<R: Reference>(&self, record: R) -> StoreResult<R> {
        let mut tables = self.write()?;
        let row = LabelRow::from_record(&record);
        if tables.label(row.kind, row.id).is_some() {
            return Err(catalog_core::DomainError::conflict(format!(
                "{} {} already exists",
                R::KIND.label(),
                row.id
            ))
            .into());
        }
        tables.labels.push(row);
        Ok(record)
    }

    async fn get_reference<R: Reference>(&self, id: R::Id) -> StoreResult<Option<R>> {
        Ok(self.read()?.reference(id))
    }

    async fn find_reference<R: Reference>(&self, name: &str) -> StoreResult<Option<R>> {
        let tables = self.read()?;
        Ok(tables
            .labels
            .iter()
            .find(|row| row.kind == R::KIND && row.name == name)
            .map(LabelRow::to_record))
    }

    async fn list_references<R: Reference>(&self) -> StoreResult<Vec<R>> {
        let tables = self.read()?;
        Ok(tables
            .labels
            .iter()
            .filter(|row| row.kind == R::KIND)
            .map(LabelRow::to_record)
            .collect())
    }

    async fn rename_reference<R: Reference>(&self, id: R::Id, name: &str) -> StoreResult<Option<R>> {
        let mut tables = self.write()?;
        let Some(current) = tables.reference::<R>(id) else {
            return Ok(None);
        };
        let renamed = current.renamed(name, Utc::now())?;
        let key: Uuid = id.into();
        if let Some(row) = tables
            .labels
            .iter_mut()
            .find(|row| row.kind == R::KIND && row.id == key)
        {
            *row = LabelRow::from_record(&renamed);
        }
        Ok(Some(renamed))
    }

    async fn delete_reference<R: Reference>(&self, id: R::Id) -> StoreResult<bool> {
        Ok(self.write()?.remove_label(R::KIND, id.into()))
    }

    async fn insert_color(&self, color: Color) -> StoreResult<Color> {
        let mut tables = self.write()?;
        if tables.colors.iter().any(|c| c.id == color.id) {
            return Err(catalog_core::DomainError::conflict(format!("color {} already exists", color.id)).into());
        }
        tables.colors.push(color.clone());
        Ok(color)
    }

    async fn get_color(&self, id: ColorId) -> StoreResult<Option<Color>> {
        Ok(self.read()?.colors.iter().find(|c| c.id == id).cloned())
    }

    async fn list_colors(&self) -> StoreResult<Vec<Color>> {
        Ok(self.read()?.colors.clone())
    }

    async fn delete_color(&self, id: ColorId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.colors.len();
        tables.colors.retain(|c| c.id != id);
        if tables.colors.len() == before {
            return Ok(false);
        }
        tables.variation_colors.retain(|vc| vc.color_id != id);
        debug!(color_id = %id, "color removed with its join rows");
        Ok(true)
    }

    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let product = Product::create(ProductId::new(), draft, Utc::now())?;
        let mut tables = self.write()?;
        tables.require_label(ReferenceKind::Category, product.category_id.into())?;
        tables.require_label(ReferenceKind::Brand, product.brand_id.into())?;
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
        expected: ExpectedVersion,
    ) -> StoreResult<Option<Product>> {
        let mut tables = self.write()?;
        let Some(index) = tables.products.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        expected.check(tables.products[index].version)?;
        let revised = tables.products[index].revise(draft, Utc::now())?;
        tables.require_label(ReferenceKind::Category, revised.category_id.into())?;
        tables.require_label(ReferenceKind::Brand, revised.brand_id.into())?;
        tables.products[index] = revised.clone();
        Ok(Some(revised))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        Ok(tables
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        Ok(self.write()?.remove_product(id))
    }

    async fn load_product_detail(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        self.read()?.detail(id)
    }

    async fn add_image(&self, draft: ImageDraft) -> StoreResult<ProductImage> {
        let image = ProductImage::create(draft, Utc::now())?;
        let mut tables = self.write()?;
        tables.require_product(image.product_id)?;
        if image.is_thumbnail
            && tables
                .images
                .iter()
                .any(|i| i.product_id == image.product_id && i.is_thumbnail)
        {
            return Err(catalog_core::DomainError::invariant(format!(
                "product {} already has a thumbnail image",
                image.product_id
            ))
            .into());
        }
        tables.images.push(image.clone());
        Ok(image)
    }

    async fn list_images(&self, product_id: ProductId) -> StoreResult<Vec<ProductImage>> {
        let tables = self.read()?;
        Ok(tables
            .images
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn set_thumbnail(&self, product_id: ProductId, image_id: ProductImageId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if !tables
            .images
            .iter()
            .any(|i| i.id == image_id && i.product_id == product_id)
        {
            return Ok(false);
        }
        let now = Utc::now();
        for image in tables.images.iter_mut().filter(|i| i.product_id == product_id) {
            let flag = image.id == image_id;
            if image.is_thumbnail != flag {
                image.is_thumbnail = flag;
                image.timestamps = image.timestamps.touched(now);
            }
        }
        Ok(true)
    }

    async fn delete_image(&self, id: ProductImageId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.images.len();
        tables.images.retain(|i| i.id != id);
        Ok(tables.images.len() != before)
    }

    async fn add_video(&self, draft: VideoDraft) -> StoreResult<ProductVideo> {
        let video = ProductVideo::create(draft, Utc::now())?;
        let mut tables = self.write()?;
        tables.require_product(video.product_id)?;
        tables.require_label(ReferenceKind::VideoProvider, video.provider_id.into())?;
        tables.videos.push(video.clone());
        Ok(video)
    }

    async fn list_videos(&self, product_id: ProductId) -> StoreResult<Vec<ProductVideo>> {
        let tables = self.read()?;
        Ok(tables
            .videos
            .iter()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn delete_video(&self, id: ProductVideoId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.videos.len();
        tables.videos.retain(|v| v.id != id);
        Ok(tables.videos.len() != before)
    }

    async fn add_variation(&self, draft: VariationDraft) -> StoreResult<ProductVariation> {
        let now = Utc::now();
        let variation = ProductVariation::create(draft.product_id, draft.label.as_deref(), now)?;
        let mut tables = self.write()?;
        tables.require_product(variation.product_id)?;
        for attribute_id in &draft.attribute_ids {
            tables.require_label(ReferenceKind::Attribute, (*attribute_id).into())?;
        }
        for color_id in &draft.color_ids {
            tables.require_color(*color_id)?;
        }

        tables.variations.push(variation.clone());
        for attribute_id in dedup(draft.attribute_ids) {
            tables.variation_attributes.push(VariationAttribute {
                variation_id: variation.id,
                attribute_id,
                created_at: now,
            });
        }
        for color_id in dedup(draft.color_ids) {
            tables.variation_colors.push(VariationColor {
                variation_id: variation.id,
                color_id,
                created_at: now,
            });
        }
        Ok(variation)
    }

    async fn list_variations(&self, product_id: ProductId) -> StoreResult<Vec<ProductVariation>> {
        let tables = self.read()?;
        Ok(tables
            .variations
            .iter()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn attach_attribute(
        &self,
        variation_id: ProductVariationId,
        attribute_id: AttributeId,
    ) -> StoreResult<Attached> {
        let mut tables = self.write()?;
        tables.require_variation(variation_id)?;
        tables.require_label(ReferenceKind::Attribute, attribute_id.into())?;
        if tables
            .variation_attributes
            .iter()
            .any(|va| va.variation_id == variation_id && va.attribute_id == attribute_id)
        {
            return Ok(Attached::AlreadyPresent);
        }
        tables.variation_attributes.push(VariationAttribute {
            variation_id,
            attribute_id,
            created_at: Utc::now(),
        });
        Ok(Attached::Added)
    }

    async fn detach_attribute(
        &self,
        variation_id: ProductVariationId,
        attribute_id: AttributeId,
    ) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let in_use = tables.prices.iter().any(|p| {
            p.variation_id == variation_id
                && tables
                    .price_attributes
                    .iter()
                    .any(|pa| pa.price_id == p.id && pa.attribute_id == attribute_id)
        });
        if in_use {
            return Err(catalog_core::DomainError::invariant(format!(
                "attribute {attribute_id} still narrows a price row of variation {variation_id}"
            ))
            .into());
        }
        let before = tables.variation_attributes.len();
        tables
            .variation_attributes
            .retain(|va| !(va.variation_id == variation_id && va.attribute_id == attribute_id));
        Ok(tables.variation_attributes.len() != before)
    }

    async fn attach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<Attached> {
        let mut tables = self.write()?;
        tables.require_variation(variation_id)?;
        tables.require_color(color_id)?;
        if tables
            .variation_colors
            .iter()
            .any(|vc| vc.variation_id == variation_id && vc.color_id == color_id)
        {
            return Ok(Attached::AlreadyPresent);
        }
        tables.variation_colors.push(VariationColor {
            variation_id,
            color_id,
            created_at: Utc::now(),
        });
        Ok(Attached::Added)
    }

    async fn detach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.variation_colors.len();
        tables
            .variation_colors
            .retain(|vc| !(vc.variation_id == variation_id && vc.color_id == color_id));
        Ok(tables.variation_colors.len() != before)
    }

    async fn delete_variation(&self, id: ProductVariationId) -> StoreResult<bool> {
        Ok(self.write()?.remove_variation(id))
    }

    async fn add_price(&self, draft: PriceDraft) -> StoreResult<ProductPrice> {
        let now = Utc::now();
        let price = ProductPrice::create(&draft, now)?;
        let mut tables = self.write()?;
        tables.require_variation(price.variation_id)?;
        for attribute_id in &draft.attribute_ids {
            tables.require_label(ReferenceKind::Attribute, (*attribute_id).into())?;
        }
        ensure_attribute_subset(&draft.attribute_ids, &tables.variation_attribute_ids(price.variation_id))?;

        tables.prices.push(price.clone());
        for attribute_id in dedup(draft.attribute_ids) {
            tables.price_attributes.push(PriceAttribute {
                price_id: price.id,
                attribute_id,
                created_at: now,
            });
        }
        Ok(price)
    }

    async fn list_prices(&self, variation_id: ProductVariationId) -> StoreResult<Vec<ProductPrice>> {
        let tables = self.read()?;
        Ok(tables
            .prices
            .iter()
            .filter(|p| p.variation_id == variation_id)
            .cloned()
            .collect())
    }

    async fn delete_price(&self, id: ProductPriceId) -> StoreResult<bool> {
        Ok(self.write()?.remove_price(id))
    }
}

/// Drop repeated ids, keeping first-seen order.
fn dedup<T: PartialEq>(ids: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
