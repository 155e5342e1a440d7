//! Materialised admin list pages.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use catalog_core::{Entity, Timestamps};
use catalog_infra::{CatalogStore, ProductFilter, StoreError};
use catalog_products::{
    Attribute, Brand, Category, Color, PriceDetail, Product, ProductDetail, ProductImage, ProductVideo, Reference,
    VariationDetail, VideoProvider,
};

use crate::projections::{self, PriceSummary};
use crate::registry::{AdminEntity, Column, DerivedView, ModelAdmin};

/// A rendered list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListView {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub id: Uuid,
    pub cells: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ListViewError {
    #[error("{field:?} is not a list filter of {entity:?}")]
    UnknownFilter { entity: AdminEntity, field: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds the [`ListView`] of one registry entry.
#[derive(Debug, Clone)]
pub struct ListViewBuilder<'a> {
    admin: &'a ModelAdmin,
    today: NaiveDate,
    media_base_url: String,
    search: Option<String>,
    filters: Vec<(&'static str, String)>,
}

impl<'a> ListViewBuilder<'a> {
    pub fn new(admin: &'a ModelAdmin, today: NaiveDate) -> Self {
        Self {
            admin,
            today,
            media_base_url: "/media/".to_string(),
            search: None,
            filters: Vec::new(),
        }
    }

    pub fn media_base_url(mut self, url: impl Into<String>) -> Self {
        self.media_base_url = url.into();
        self
    }

    /// Keep rows where any search field contains `text` (case-insensitive).
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into().trim().to_lowercase();
        self.search = (!text.is_empty()).then_some(text);
        self
    }

    /// Keep rows whose `field` renders exactly as `value`. `field` must be one
    /// of the entry's `list_filter` fields.
    pub fn filter(mut self, field: &str, value: impl Into<String>) -> Result<Self, ListViewError> {
        let Some(&known) = self.admin.list_filter.iter().find(|f| **f == field) else {
            return Err(ListViewError::UnknownFilter {
                entity: self.admin.entity,
                field: field.to_string(),
            });
        };
        self.filters.push((known, value.into()));
        Ok(self)
    }

    pub async fn build<S: CatalogStore>(&self, store: &S) -> Result<ListView, ListViewError> {
        let records = load_records(store, self.admin.entity, self.today).await?;

        let rows = records
            .iter()
            .filter(|record| self.matches_filters(record))
            .filter(|record| self.matches_search(record))
            .map(|record| ListRow {
                id: record.id(),
                cells: self
                    .admin
                    .list_display
                    .iter()
                    .map(|column| self.cell(record, *column))
                    .collect(),
            })
            .collect();

        Ok(ListView {
            title: self.admin.menu_label.to_string(),
            columns: self.admin.list_display.iter().map(|c| c.header()).collect(),
            rows,
        })
    }

    fn matches_filters(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, wanted)| match (record, *field) {
                // tags is a set: match membership, not the rendered list
                (Record::Product { product, .. }, "tags") => product.has_tag(wanted),
                _ => record.field(field).is_some_and(|v| v == *wanted),
            })
    }

    fn matches_search(&self, record: &Record) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };
        self.admin
            .search_fields
            .iter()
            .filter_map(|f| record.field(f))
            .any(|value| value.to_lowercase().contains(needle.as_str()))
    }

    fn cell(&self, record: &Record, column: Column) -> String {
        match column {
            Column::Field(name) => record.field(name).unwrap_or_else(|| "-".to_string()),
            Column::Derived(view) => self.derived(record, view),
        }
    }

    fn derived(&self, record: &Record, view: DerivedView) -> String {
        match (record, view) {
            (Record::Product { summary, .. }, DerivedView::Prices) => projections::render_price_summary(summary),
            (Record::Product { detail: Some(detail), .. }, DerivedView::ProductImage) => {
                projections::render_thumbnail(detail, &self.media_base_url)
            }
            (Record::Product { detail: None, .. }, DerivedView::ProductImage) => projections::NO_THUMBNAIL.to_string(),
            (Record::Product { detail: Some(detail), .. }, DerivedView::ProductVideo) => {
                projections::render_video(detail)
            }
            (Record::Product { detail: None, .. }, DerivedView::ProductVideo) => projections::NO_VIDEO.to_string(),
            (Record::Image { image, .. }, DerivedView::ImageThumbnail) => {
                projections::render_image_preview(Some(&image.image), &self.media_base_url)
            }
            (Record::Price { price, .. }, DerivedView::PriceAttributes) => price.attribute_names(),
            (Record::Variation { variation, .. }, DerivedView::VariationAttributes) => variation.attribute_names(),
            (Record::Variation { variation, .. }, DerivedView::VariationColors) => variation.color_names(),
            // the registry rejects views placed on the wrong entity
            _ => "-".to_string(),
        }
    }
}

/// One list row's source data.
enum Record {
    Reference {
        id: Uuid,
        name: String,
        stamps: Timestamps,
    },
    Color(Color),
    Product {
        product: Product,
        category: String,
        brand: String,
        detail: Option<ProductDetail>,
        summary: PriceSummary,
    },
    Image {
        image: ProductImage,
        product: String,
    },
    Video {
        video: ProductVideo,
        provider: String,
        product: String,
    },
    Variation {
        variation: VariationDetail,
        product: String,
    },
    Price {
        price: PriceDetail,
        variation: String,
    },
}

impl Record {
    fn reference<R: Reference>(record: &R) -> Self {
        Record::Reference {
            id: record.reference_id().into(),
            name: record.name().to_string(),
            stamps: record.timestamps(),
        }
    }

    fn id(&self) -> Uuid {
        match self {
            Record::Reference { id, .. } => *id,
            Record::Color(color) => color.key(),
            Record::Product { product, .. } => product.key(),
            Record::Image { image, .. } => image.key(),
            Record::Video { video, .. } => video.key(),
            Record::Variation { variation, .. } => variation.variation.key(),
            Record::Price { price, .. } => price.price.key(),
        }
    }

    fn stamps(&self) -> Timestamps {
        match self {
            Record::Reference { stamps, .. } => *stamps,
            Record::Color(color) => color.recorded(),
            Record::Product { product, .. } => product.recorded(),
            Record::Image { image, .. } => image.recorded(),
            Record::Video { video, .. } => video.recorded(),
            Record::Variation { variation, .. } => variation.variation.recorded(),
            Record::Price { price, .. } => price.price.recorded(),
        }
    }

    /// Rendered value of a stored field, `None` for unset optional fields.
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => return Some(self.id().to_string()),
            "created_at" => return Some(datetime(&self.stamps().created_at)),
            "updated_at" => return Some(datetime(&self.stamps().updated_at)),
            _ => {}
        }
        match self {
            Record::Reference { name: value, .. } => (name == "name").then(|| value.clone()),
            Record::Color(color) => match name {
                "name" => Some(color.name.clone()),
                "color_code" => Some(color.color_code.to_string()),
                _ => None,
            },
            Record::Product {
                product,
                category,
                brand,
                ..
            } => match name {
                "name" => Some(product.name.clone()),
                "category" => Some(category.clone()),
                "brand" => Some(brand.clone()),
                "description" => product.description.clone(),
                "weight" => product.weight_kg.map(|w| w.to_string()),
                "min_purchase_qty" => Some(product.min_purchase_qty.to_string()),
                "barcode" => product.barcode.clone(),
                "refundable" => Some(yes_no(product.refundable)),
                "base_price" => Some(product.base_price.to_string()),
                "tags" => Some(product.tags.iter().cloned().collect::<Vec<_>>().join(", ")),
                "version" => Some(product.version.to_string()),
                _ => None,
            },
            Record::Image { image, product } => match name {
                "product" => Some(product.clone()),
                "image" => Some(image.image.to_string()),
                "is_thumbnail" => Some(yes_no(image.is_thumbnail)),
                "description" => image.description.clone(),
                _ => None,
            },
            Record::Video {
                video,
                provider,
                product,
            } => match name {
                "product" => Some(product.clone()),
                "video_provider" => Some(provider.clone()),
                "video_link" => video.video_link.as_ref().map(|l| l.to_string()),
                _ => None,
            },
            Record::Variation { variation, product } => match name {
                "product" => Some(product.clone()),
                "label" => variation.variation.label.clone(),
                _ => None,
            },
            Record::Price { price, variation } => {
                let p = &price.price;
                match name {
                    "product_variation" => Some(variation.clone()),
                    "unit_price" => Some(p.unit_price.to_string()),
                    "discount" => p.discount.map(|d| d.to_string()),
                    "discount_start_date" => p.discount_start_date.map(|d| d.to_string()),
                    "discount_end_date" => p.discount_end_date.map(|d| d.to_string()),
                    _ => None,
                }
            }
        }
    }
}

fn datetime(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn yes_no(value: bool) -> String {
    let label = if value { "Yes" } else { "No" };
    label.to_string()
}

async fn load_records<S: CatalogStore>(
    store: &S,
    entity: AdminEntity,
    today: NaiveDate,
) -> Result<Vec<Record>, StoreError> {
    let records = match entity {
        AdminEntity::Brand => references::<Brand, S>(store).await?,
        AdminEntity::Category => references::<Category, S>(store).await?,
        AdminEntity::VideoProvider => references::<VideoProvider, S>(store).await?,
        AdminEntity::Attribute => references::<Attribute, S>(store).await?,
        AdminEntity::Color => store.list_colors().await?.into_iter().map(Record::Color).collect(),
        AdminEntity::Product => products(store, today).await?,
        AdminEntity::ProductImage => store
            .list_product_details(&ProductFilter::default())
            .await?
            .into_iter()
            .flat_map(|detail| {
                let product = detail.product.name.clone();
                detail.images.into_iter().map(move |image| Record::Image {
                    image,
                    product: product.clone(),
                })
            })
            .collect(),
        AdminEntity::ProductVideo => store
            .list_product_details(&ProductFilter::default())
            .await?
            .into_iter()
            .flat_map(|detail| {
                let product = detail.product.name.clone();
                detail.videos.into_iter().map(move |entry| Record::Video {
                    provider: entry.provider.name,
                    video: entry.video,
                    product: product.clone(),
                })
            })
            .collect(),
        AdminEntity::ProductVariation => store
            .list_product_details(&ProductFilter::default())
            .await?
            .into_iter()
            .flat_map(|detail| {
                let product = detail.product.name.clone();
                detail.variations.into_iter().map(move |variation| Record::Variation {
                    variation,
                    product: product.clone(),
                })
            })
            .collect(),
        AdminEntity::ProductPrice => store
            .list_product_details(&ProductFilter::default())
            .await?
            .into_iter()
            .flat_map(|detail| detail.variations)
            .flat_map(|variation| {
                let label = variation.variation.to_string();
                variation.prices.into_iter().map(move |price| Record::Price {
                    price,
                    variation: label.clone(),
                })
            })
            .collect(),
    };
    Ok(records)
}

async fn references<R: Reference, S: CatalogStore>(store: &S) -> Result<Vec<Record>, StoreError> {
    Ok(store
        .list_references::<R>()
        .await?
        .iter()
        .map(Record::reference)
        .collect())
}

/// Product rows. A product whose owned records fail to load still gets a row;
/// only its derived columns degrade.
async fn products<S: CatalogStore>(store: &S, today: NaiveDate) -> Result<Vec<Record>, StoreError> {
    let categories: HashMap<_, _> = store
        .list_references::<Category>()
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let brands: HashMap<_, _> = store
        .list_references::<Brand>()
        .await?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();

    let mut records = Vec::new();
    for product in store.list_products(&ProductFilter::default()).await? {
        let (detail, summary) = match store.load_product_detail(product.id).await {
            Ok(Some(detail)) => {
                let summary = projections::price_summary(&detail, today);
                (Some(detail), summary)
            }
            Ok(None) => (None, PriceSummary::Failed(format!("product {} no longer exists", product.id))),
            Err(err) => {
                tracing::warn!(product_id = %product.id, error = %err, "product detail failed to load");
                (None, PriceSummary::Failed(err.to_string()))
            }
        };
        records.push(Record::Product {
            category: categories.get(&product.category_id).cloned().unwrap_or_default(),
            brand: brands.get(&product.brand_id).cloned().unwrap_or_default(),
            product,
            detail,
            summary,
        });
    }
    Ok(records)
}
