//! The product aggregate loaded together with everything it owns.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::media::{ProductImage, ProductVideo, VideoLink};
use crate::pricing::ProductPrice;
use crate::product::Product;
use crate::reference::{Attribute, Brand, Category, Color, VideoProvider};
use crate::variation::ProductVariation;

/// A product with its resolved references and owned records.
///
/// Collections are in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub brand: Brand,
    pub images: Vec<ProductImage>,
    pub videos: Vec<VideoEntry>,
    pub variations: Vec<VariationDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub video: ProductVideo,
    pub provider: VideoProvider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationDetail {
    pub variation: ProductVariation,
    pub attributes: Vec<Attribute>,
    pub colors: Vec<Color>,
    pub prices: Vec<PriceDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDetail {
    pub price: ProductPrice,
    pub attributes: Vec<Attribute>,
}

impl PriceDetail {
    /// Attribute names joined with ", " (the admin "Attributes" column).
    pub fn attribute_names(&self) -> String {
        join_names(self.attributes.iter().map(|a| a.name.as_str()))
    }

    pub fn effective_price(&self, today: NaiveDate) -> Decimal {
        self.price.effective_price(today)
    }
}

impl VariationDetail {
    pub fn attribute_names(&self) -> String {
        join_names(self.attributes.iter().map(|a| a.name.as_str()))
    }

    pub fn color_names(&self) -> String {
        join_names(self.colors.iter().map(|c| c.name.as_str()))
    }
}

/// Provider name and link of a product's representative video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryVideo<'a> {
    pub provider_name: &'a str,
    pub url: &'a VideoLink,
}

impl ProductDetail {
    /// The image flagged as thumbnail, if any.
    pub fn thumbnail(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_thumbnail)
    }

    /// The first video and its provider, when that video carries a link.
    pub fn primary_video(&self) -> Option<PrimaryVideo<'_>> {
        let entry = self.videos.first()?;
        let url = entry.video.video_link.as_ref()?;
        Some(PrimaryVideo {
            provider_name: &entry.provider.name,
            url,
        })
    }

    /// Every price row of every variation, paired with its variation.
    pub fn price_rows(&self) -> impl Iterator<Item = (&VariationDetail, &PriceDetail)> {
        self.variations
            .iter()
            .flat_map(|v| v.prices.iter().map(move |p| (v, p)))
    }

    pub fn has_prices(&self) -> bool {
        self.price_rows().next().is_some()
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::media::{ImageDraft, VideoDraft};
    use crate::pricing::PriceDraft;
    use crate::product::{ProductDraft, ProductId};

    fn detail() -> ProductDetail {
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

    fn image(d: &ProductDetail, path: &str, thumb: bool) -> ProductImage {
        ProductImage::create(
            ImageDraft {
                product_id: d.product.id,
                image: path.to_string(),
                is_thumbnail: thumb,
                description: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn thumbnail_is_none_without_flagged_image() {
        let mut d = detail();
        assert!(d.thumbnail().is_none());
        let plain = image(&d, "a.jpg", false);
        d.images.push(plain);
        assert!(d.thumbnail().is_none());
    }

    #[test]
    fn thumbnail_is_the_flagged_image() {
        let mut d = detail();
        let plain = image(&d, "a.jpg", false);
        d.images.push(plain);
        let thumb = image(&d, "b.jpg", true);
        d.images.push(thumb.clone());
        assert_eq!(d.thumbnail(), Some(&thumb));
    }

    #[test]
    fn primary_video_is_first_video_with_provider() {
        let mut d = detail();
        assert!(d.primary_video().is_none());

        let provider = VideoProvider::new("YouTube", Utc::now()).unwrap();
        let video = ProductVideo::create(
            VideoDraft {
                product_id: d.product.id,
                provider_id: provider.id,
                video_link: Some("https://www.youtube.com/watch?v=x".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        d.videos.push(VideoEntry { video, provider });

        let primary = d.primary_video().unwrap();
        assert_eq!(primary.provider_name, "YouTube");
        assert_eq!(primary.url.as_str(), "https://www.youtube.com/watch?v=x");
    }

    #[test]
    fn primary_video_without_link_is_none() {
        let mut d = detail();
        let provider = VideoProvider::new("Vimeo", Utc::now()).unwrap();
        let video = ProductVideo::create(
            VideoDraft {
                product_id: d.product.id,
                provider_id: provider.id,
                video_link: None,
            },
            Utc::now(),
        )
        .unwrap();
        d.videos.push(VideoEntry { video, provider });
        assert!(d.primary_video().is_none());
    }

    #[test]
    fn price_rows_flatten_variations() {
        let mut d = detail();
        assert!(!d.has_prices());

        let now = Utc::now();
        let size = Attribute::new("size", now).unwrap();
        let color = Attribute::new("color", now).unwrap();
        let variation = ProductVariation::create(d.product.id, None, now).unwrap();
        let price = ProductPrice::create(&PriceDraft::new(variation.id, Decimal::from(10)), now).unwrap();
        d.variations.push(VariationDetail {
            variation,
            attributes: vec![size.clone(), color.clone()],
            colors: vec![],
            prices: vec![PriceDetail {
                price,
                attributes: vec![size, color],
            }],
        });

        let rows: Vec<_> = d.price_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.attribute_names(), "size, color");
        assert_eq!(rows[0].0.attribute_names(), "size, color");
        assert_eq!(rows[0].0.color_names(), "");
    }
}
