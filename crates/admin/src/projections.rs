//! Display glue for the admin list pages.
//!
//! Every function is pure over an already-loaded [`ProductDetail`]; loading
//! (and deciding what a load failure looks like) is [`load_price_summary`]'s
//! job.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use catalog_infra::CatalogStore;
use catalog_products::{ImageRef, ProductDetail, ProductId};

pub const NO_THUMBNAIL: &str = "None";
pub const NO_VIDEO: &str = "No Video Link";
pub const NO_IMAGE: &str = "No Image";
pub const NOT_AVAILABLE: &str = "Not Available";
pub const FAILED_TO_LOAD: &str = "Failed to load prices";

/// One price row as shown in the product list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLine {
    /// Attribute names joined with ", ".
    pub attributes: String,
    pub unit_price: Decimal,
    pub discount: Option<Decimal>,
    pub discount_start_date: Option<NaiveDate>,
    pub discount_end_date: Option<NaiveDate>,
    /// Price charged on the day the summary was built.
    pub effective_price: Decimal,
}

/// Price column of a product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "lines", rename_all = "snake_case")]
pub enum PriceSummary {
    Lines(Vec<PriceLine>),
    /// The product has no variations or no price rows.
    NotAvailable,
    /// The product's prices could not be loaded.
    Failed(String),
}

/// Every price row of every variation, in creation order.
pub fn price_lines(detail: &ProductDetail, today: NaiveDate) -> Vec<PriceLine> {
    detail
        .price_rows()
        .map(|(_, row)| PriceLine {
            attributes: row.attribute_names(),
            unit_price: row.price.unit_price,
            discount: row.price.discount,
            discount_start_date: row.price.discount_start_date,
            discount_end_date: row.price.discount_end_date,
            effective_price: row.effective_price(today),
        })
        .collect()
}

pub fn price_summary(detail: &ProductDetail, today: NaiveDate) -> PriceSummary {
    let lines = price_lines(detail, today);
    if lines.is_empty() {
        PriceSummary::NotAvailable
    } else {
        PriceSummary::Lines(lines)
    }
}

/// Load a product and summarise its prices; store failures become
/// [`PriceSummary::Failed`].
pub async fn load_price_summary<S: CatalogStore>(store: &S, product_id: ProductId, today: NaiveDate) -> PriceSummary {
    match store.load_product_detail(product_id).await {
        Ok(Some(detail)) => price_summary(&detail, today),
        Ok(None) => PriceSummary::Failed(format!("product {product_id} no longer exists")),
        Err(err) => {
            warn!(%product_id, error = %err, "price summary failed to load");
            PriceSummary::Failed(err.to_string())
        }
    }
}

/// HTML for the price column.
pub fn render_price_summary(summary: &PriceSummary) -> String {
    let lines = match summary {
        PriceSummary::NotAvailable => return NOT_AVAILABLE.to_string(),
        PriceSummary::Failed(_) => return FAILED_TO_LOAD.to_string(),
        PriceSummary::Lines(lines) => lines,
    };

    let mut html = String::new();
    for line in lines {
        html.push_str(&format!("Attributes: {}<br>", escape_html(&line.attributes)));
        html.push_str(&format!("Unit Price: {}<br>", line.unit_price));
        html.push_str(&format!("Discount: {}%<br>", or_none(line.discount)));
        html.push_str(&format!("Discount Start Date: {}<br>", or_none(line.discount_start_date)));
        html.push_str(&format!("Discount End Date: {}<br>", or_none(line.discount_end_date)));
        html.push_str(&format!("Effective Price: {}<br>", line.effective_price));
        html.push_str("<br>");
    }
    html
}

/// HTML for the product list "Product Image" column.
pub fn render_thumbnail(detail: &ProductDetail, media_base_url: &str) -> String {
    match detail.thumbnail() {
        Some(image) => format!(
            r#"<img src="{}" style="max-height: 100px; margin: 5px;" />"#,
            escape_html(&image.image.url(media_base_url))
        ),
        None => NO_THUMBNAIL.to_string(),
    }
}

/// HTML for the product list "Product Video" column.
pub fn render_video(detail: &ProductDetail) -> String {
    match detail.primary_video() {
        Some(video) => format!(
            r#"<span>{}:&nbsp;<a href="{}" target="_blank">Video Link</a></span>"#,
            escape_html(video.provider_name),
            escape_html(video.url.as_str())
        ),
        None => NO_VIDEO.to_string(),
    }
}

/// HTML for the image list "Thumbnail" column.
pub fn render_image_preview(image: Option<&ImageRef>, media_base_url: &str) -> String {
    match image {
        Some(image) => format!(
            r#"<img src="{}" style="max-width: 100px; max-height: 100px;" />"#,
            escape_html(&image.url(media_base_url))
        ),
        None => NO_IMAGE.to_string(),
    }
}

/// Escape text for interpolation into HTML content or a quoted attribute.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn or_none<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use catalog_infra::{InMemoryCatalogStore, ProductFilter, seed_demo_catalog};

    use crate::testing::FlakyDetailStore;
    use catalog_products::{
        Brand, Category, ImageDraft, PriceDetail, PriceDraft, Product, ProductDraft, ProductImage, ProductPrice,
        ProductVariation, VariationDetail,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bare_detail() -> ProductDetail {
        let now = Utc::now();
        let category = Category::new("Electronics", now).unwrap();
        let brand = Brand::new("Nike", now).unwrap();
        let product = Product::create(
            ProductId::new(),
            ProductDraft::new("Smartphone", category.id, brand.id, Decimal::from(100)),
            now,
        )
        .unwrap();
        ProductDetail {
            product,
            category,
            brand,
            images: vec![],
            videos: vec![],
            variations: vec![],
        }
    }

    fn with_price(mut detail: ProductDetail, draft: impl FnOnce(ProductVariation) -> PriceDraft) -> ProductDetail {
        let variation = ProductVariation::create(detail.product.id, None, Utc::now()).unwrap();
        let price = ProductPrice::create(&draft(variation.clone()), Utc::now()).unwrap();
        detail.variations.push(VariationDetail {
            variation,
            attributes: vec![],
            colors: vec![],
            prices: vec![PriceDetail {
                price,
                attributes: vec![],
            }],
        });
        detail
    }

    #[test]
    fn zero_variations_is_not_available() {
        let detail = bare_detail();
        assert!(price_lines(&detail, date(2024, 1, 1)).is_empty());
        let summary = price_summary(&detail, date(2024, 1, 1));
        assert_eq!(summary, PriceSummary::NotAvailable);
        assert_eq!(render_price_summary(&summary), "Not Available");
    }

    #[test]
    fn variation_without_prices_is_not_available() {
        let mut detail = bare_detail();
        detail.variations.push(VariationDetail {
            variation: ProductVariation::create(detail.product.id, None, Utc::now()).unwrap(),
            attributes: vec![],
            colors: vec![],
            prices: vec![],
        });
        assert_eq!(price_summary(&detail, date(2024, 1, 1)), PriceSummary::NotAvailable);
    }

    #[test]
    fn failed_is_distinct_from_empty() {
        let failed = PriceSummary::Failed("connection refused".to_string());
        assert_eq!(render_price_summary(&failed), "Failed to load prices");
        assert_ne!(render_price_summary(&failed), render_price_summary(&PriceSummary::NotAvailable));
    }

    #[test]
    fn lines_render_every_field() {
        let detail = with_price(bare_detail(), |v| {
            PriceDraft::new(v.id, Decimal::new(10000, 2)).with_discount(
                Decimal::from(20),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
        });
        let summary = price_summary(&detail, date(2024, 1, 15));
        let PriceSummary::Lines(lines) = &summary else {
            panic!("expected lines, got {summary:?}");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].effective_price, Decimal::new(8000, 2));

        assert_eq!(
            render_price_summary(&summary),
            "Attributes: <br>\
             Unit Price: 100.00<br>\
             Discount: 20.00%<br>\
             Discount Start Date: 2024-01-01<br>\
             Discount End Date: 2024-01-31<br>\
             Effective Price: 80.00<br>\
             <br>"
        );
    }

    #[test]
    fn missing_discount_renders_none() {
        let detail = with_price(bare_detail(), |v| PriceDraft::new(v.id, Decimal::from(5)));
        let html = render_price_summary(&price_summary(&detail, date(2024, 1, 1)));
        assert!(html.contains("Discount: None%<br>"));
        assert!(html.contains("Discount Start Date: None<br>"));
    }

    #[test]
    fn thumbnail_column() {
        let mut detail = bare_detail();
        assert_eq!(render_thumbnail(&detail, "/media/"), "None");

        let image = ProductImage::create(
            ImageDraft {
                product_id: detail.product.id,
                image: "products/a.jpg".to_string(),
                is_thumbnail: true,
                description: None,
            },
            Utc::now(),
        )
        .unwrap();
        detail.images.push(image);
        assert_eq!(
            render_thumbnail(&detail, "/media/"),
            r#"<img src="/media/products/a.jpg" style="max-height: 100px; margin: 5px;" />"#
        );
    }

    #[test]
    fn video_column_without_videos() {
        assert_eq!(render_video(&bare_detail()), "No Video Link");
    }

    #[test]
    fn image_preview_column() {
        let image = ImageRef::parse("https://cdn.example.com/a.jpg").unwrap();
        assert_eq!(
            render_image_preview(Some(&image), "/media/"),
            r#"<img src="https://cdn.example.com/a.jpg" style="max-width: 100px; max-height: 100px;" />"#
        );
        assert_eq!(render_image_preview(None, "/media/"), "No Image");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    }

    #[tokio::test]
    async fn seeded_product_video_and_prices() {
        let store = InMemoryCatalogStore::new();
        let today = date(2024, 6, 1);
        seed_demo_catalog(&store, today).await.unwrap();
        let product = store.list_products(&ProductFilter::default()).await.unwrap().remove(0);

        let detail = store.load_product_detail(product.id).await.unwrap().unwrap();
        assert_eq!(
            render_video(&detail),
            r#"<span>YouTube:&nbsp;<a href="https://www.youtube.com/watch?v=dQw4w9WgXcQ" target="_blank">Video Link</a></span>"#
        );

        match load_price_summary(&store, product.id, today).await {
            PriceSummary::Lines(lines) => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].attributes, "size");
            }
            other => panic!("expected lines, got {other:?}"),
        }

        assert!(matches!(
            load_price_summary(&store, ProductId::new(), today).await,
            PriceSummary::Failed(_)
        ));
    }

    #[tokio::test]
    async fn store_error_becomes_failed_summary() {
        let store = FlakyDetailStore::new(InMemoryCatalogStore::new());
        let today = date(2024, 6, 1);
        seed_demo_catalog(&store.inner, today).await.unwrap();
        let product = store.list_products(&ProductFilter::default()).await.unwrap().remove(0);
        store.break_detail(product.id);

        let summary = load_price_summary(&store, product.id, today).await;
        match &summary {
            PriceSummary::Failed(reason) => assert!(reason.contains("connection reset by peer")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(render_price_summary(&summary), "Failed to load prices");
    }
}
