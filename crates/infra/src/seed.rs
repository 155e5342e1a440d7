//! Demo catalog seeding.
//!
//! Every step goes through an upsert, so running the seed twice leaves the
//! catalog unchanged the second time.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use catalog_products::{
    Attribute, Brand, Category, ImageDraft, PriceDraft, ProductDraft, VariationDraft, VideoDraft, VideoProvider,
};

use crate::error::StoreResult;
use crate::store::CatalogStore;
use crate::upsert::Upserted;

const DEMO_COLORS: [(&str, &str); 3] = [("red", "#FF0000"), ("green", "#00FF00"), ("indigo", "#4B0082")];

/// How many records a seeding run created versus found already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}

impl SeedReport {
    fn note<T>(&mut self, outcome: Upserted<T>) -> T {
        let (record, created) = outcome.into_parts();
        if created {
            self.created += 1;
        } else {
            self.existing += 1;
        }
        record
    }
}

/// Populate `store` with a small demo catalog: one smartphone with media,
/// a variation and a discounted price row starting `today`.
pub async fn seed_demo_catalog<S: CatalogStore>(store: &S, today: NaiveDate) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();

    let category = report.note(store.upsert_reference::<Category>("Electronics").await?);
    let brand = report.note(store.upsert_reference::<Brand>("Nike").await?);
    let youtube = report.note(store.upsert_reference::<VideoProvider>("YouTube").await?);

    let mut draft = ProductDraft::new("Smartphone", category.id, brand.id, Decimal::new(79999, 2));
    draft.description = Some("A high-end smartphone with advanced features.".to_string());
    draft.weight_kg = Some(Decimal::new(2, 1));
    draft.min_purchase_qty = 10;
    draft.barcode = Some("123456789".to_string());
    draft.refundable = true;
    let product = report.note(store.upsert_product(draft).await?);

    report.note(
        store
            .upsert_image(ImageDraft {
                product_id: product.id,
                image: "products/smartphone.jpg".to_string(),
                is_thumbnail: true,
                description: Some("Thumbnail image".to_string()),
            })
            .await?,
    );
    report.note(
        store
            .upsert_video(VideoDraft {
                product_id: product.id,
                provider_id: youtube.id,
                video_link: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
            })
            .await?,
    );

    let size = report.note(store.upsert_reference::<Attribute>("size").await?);
    let color = report.note(store.upsert_reference::<Attribute>("color").await?);

    let mut color_ids = Vec::with_capacity(DEMO_COLORS.len());
    for (name, code) in DEMO_COLORS {
        color_ids.push(report.note(store.upsert_color(name, code).await?).id);
    }

    let variation = match store.list_variations(product.id).await?.into_iter().next() {
        Some(existing) => {
            report.existing += 1;
            existing
        }
        None => {
            let mut vd = VariationDraft::new(product.id);
            vd.attribute_ids = vec![size.id, color.id];
            vd.color_ids = color_ids;
            report.created += 1;
            store.add_variation(vd).await?
        }
    };

    if store.list_prices(variation.id).await?.is_empty() {
        let mut pd = PriceDraft::new(variation.id, Decimal::new(79999, 2)).with_discount(
            Decimal::from(10),
            today,
            today + Duration::days(30),
        );
        pd.attribute_ids = vec![size.id];
        store.add_price(pd).await?;
        report.created += 1;
    } else {
        report.existing += 1;
    }

    info!(created = report.created, existing = report.existing, "demo catalog seeded");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryCatalogStore, ProductFilter};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn seeds_the_demo_product() {
        let store = InMemoryCatalogStore::new();
        let report = seed_demo_catalog(&store, today()).await.unwrap();
        assert_eq!(report.existing, 0);
        assert!(report.created > 0);

        let products = store.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(products.len(), 1);
        let detail = store.load_product_detail(products[0].id).await.unwrap().unwrap();

        assert_eq!(detail.product.name, "Smartphone");
        assert_eq!(detail.product.min_purchase_qty, 10);
        assert_eq!(detail.product.weight_kg, Some(Decimal::new(2, 1)));
        assert!(detail.product.refundable);
        assert_eq!(detail.category.name, "Electronics");
        assert_eq!(detail.brand.name, "Nike");
        assert!(detail.thumbnail().is_some());
        assert_eq!(detail.primary_video().unwrap().provider_name, "YouTube");

        let variation = &detail.variations[0];
        assert_eq!(variation.attribute_names(), "size, color");
        assert_eq!(variation.color_names(), "red, green, indigo");

        let price = &variation.prices[0];
        assert_eq!(price.attribute_names(), "size");
        assert_eq!(price.effective_price(today()), Decimal::new(71999, 2));
        assert_eq!(price.effective_price(today() + Duration::days(31)), Decimal::new(79999, 2));
    }

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let store = InMemoryCatalogStore::new();
        let first = seed_demo_catalog(&store, today()).await.unwrap();
        let second = seed_demo_catalog(&store, today()).await.unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.existing, first.created);

        let products = store.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(products.len(), 1);
        let variations = store.list_variations(products[0].id).await.unwrap();
        assert_eq!(variations.len(), 1);
        assert_eq!(store.list_prices(variations[0].id).await.unwrap().len(), 1);
        assert_eq!(store.list_colors().await.unwrap().len(), 3);
    }
}
