//! The product record: draft validation, revisions and tags.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{AggregateRoot, DomainError, DomainResult, Entity, Timestamps};

use crate::reference::{BrandId, CategoryId};
use crate::validate;

catalog_core::uuid_id!(
    /// Product identifier.
    ProductId,
    "ProductId"
);

/// Editable fields of a product, as submitted by the admin form or a seed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub description: Option<String>,
    /// Weight in kilograms.
    pub weight_kg: Option<Decimal>,
    pub min_purchase_qty: u32,
    pub barcode: Option<String>,
    pub refundable: bool,
    pub base_price: Decimal,
    pub tags: Vec<String>,
}

impl ProductDraft {
    pub fn new(
        name: impl Into<String>,
        category_id: CategoryId,
        brand_id: BrandId,
        base_price: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            category_id,
            brand_id,
            description: None,
            weight_kg: None,
            min_purchase_qty: 1,
            barcode: None,
            refundable: false,
            base_price,
            tags: Vec::new(),
        }
    }
}

/// Aggregate root: Product.
///
/// Owns its images, videos and variations (and, through the variations, its
/// price rows). Those are stored separately and loaded together as a
/// [`ProductDetail`](crate::detail::ProductDetail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub description: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub min_purchase_qty: u32,
    pub barcode: Option<String>,
    pub refundable: bool,
    pub base_price: Decimal,
    /// Free-text labels managed by the tagging collaborator.
    pub tags: BTreeSet<String>,
    pub version: u64,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Product {
    pub const MAX_NAME_LEN: usize = 255;
    pub const MAX_BARCODE_LEN: usize = 50;

    /// Validate a draft into a brand-new product at version 1.
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let fields = ValidFields::from_draft(draft)?;
        Ok(fields.into_product(id, 1, Timestamps::at(now)))
    }

    /// Validate a draft as the next revision of this product.
    pub fn revise(&self, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let fields = ValidFields::from_draft(draft)?;
        Ok(fields.into_product(self.id, self.version + 1, self.timestamps.touched(now)))
    }

    /// The current field values as an editable draft.
    pub fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            category_id: self.category_id,
            brand_id: self.brand_id,
            description: self.description.clone(),
            weight_kg: self.weight_kg,
            min_purchase_qty: self.min_purchase_qty,
            barcode: self.barcode.clone(),
            refundable: self.refundable,
            base_price: self.base_price,
            tags: self.tags.iter().cloned().collect(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag.trim())
    }
}

struct ValidFields {
    name: String,
    category_id: CategoryId,
    brand_id: BrandId,
    description: Option<String>,
    weight_kg: Option<Decimal>,
    min_purchase_qty: u32,
    barcode: Option<String>,
    refundable: bool,
    base_price: Decimal,
    tags: BTreeSet<String>,
}

impl ValidFields {
    fn from_draft(draft: ProductDraft) -> DomainResult<Self> {
        let name = validate::required_text("name", &draft.name, Product::MAX_NAME_LEN)?;

        if draft.min_purchase_qty < 1 {
            return Err(DomainError::validation("min_purchase_qty must be at least 1"));
        }

        let weight_kg = draft
            .weight_kg
            .map(|w| validate::fixed_point("weight", w, 8, 3))
            .transpose()?;

        Ok(Self {
            name,
            category_id: draft.category_id,
            brand_id: draft.brand_id,
            description: validate::optional_text("description", draft.description.as_deref(), None)?,
            weight_kg,
            min_purchase_qty: draft.min_purchase_qty,
            barcode: validate::optional_text("barcode", draft.barcode.as_deref(), Some(Product::MAX_BARCODE_LEN))?,
            refundable: draft.refundable,
            base_price: validate::fixed_point("base_price", draft.base_price, 8, 2)?,
            tags: normalize_tags(draft.tags),
        })
    }

    fn into_product(self, id: ProductId, version: u64, timestamps: Timestamps) -> Product {
        Product {
            id,
            name: self.name,
            category_id: self.category_id,
            brand_id: self.brand_id,
            description: self.description,
            weight_kg: self.weight_kg,
            min_purchase_qty: self.min_purchase_qty,
            barcode: self.barcode,
            refundable: self.refundable,
            base_price: self.base_price,
            tags: self.tags,
            version,
            timestamps,
        }
    }
}

/// Trim, drop blanks, de-duplicate.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}

impl AggregateRoot for Product {
    fn version(&self) -> u64 {
        self.version
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        let mut d = ProductDraft::new(
            "Smartphone",
            CategoryId::new(),
            BrandId::new(),
            Decimal::new(79999, 2),
        );
        d.weight_kg = Some(Decimal::new(2, 1));
        d.min_purchase_qty = 10;
        d.barcode = Some("123456789".to_string());
        d.refundable = true;
        d.description = Some("A high-end smartphone with advanced features.".to_string());
        d
    }

    #[test]
    fn create_product_starts_at_version_one() {
        let product = Product::create(ProductId::new(), draft(), Utc::now()).unwrap();
        assert_eq!(product.version(), 1);
        assert_eq!(product.to_string(), "Smartphone");
        assert_eq!(product.weight_kg.unwrap().to_string(), "0.200");
        assert_eq!(product.base_price.to_string(), "799.99");
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let mut d = draft();
        d.name = "   ".to_string();
        let err = Product::create(ProductId::new(), d, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_product_rejects_zero_min_purchase_qty() {
        let mut d = draft();
        d.min_purchase_qty = 0;
        let err = Product::create(ProductId::new(), d, Utc::now()).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("min_purchase_qty")),
            _ => panic!("Expected Validation error for min_purchase_qty"),
        }
    }

    #[test]
    fn create_product_rejects_overlong_barcode() {
        let mut d = draft();
        d.barcode = Some("9".repeat(51));
        assert!(Product::create(ProductId::new(), d, Utc::now()).is_err());
    }

    #[test]
    fn create_product_rejects_negative_price() {
        let mut d = draft();
        d.base_price = Decimal::new(-1, 0);
        assert!(Product::create(ProductId::new(), d, Utc::now()).is_err());
    }

    #[test]
    fn revise_bumps_version_and_keeps_identity() {
        let product = Product::create(ProductId::new(), draft(), Utc::now()).unwrap();
        let mut d = product.to_draft();
        d.name = "Smartphone Pro".to_string();
        let revised = product.revise(d, Utc::now()).unwrap();
        assert_eq!(revised.id, product.id);
        assert_eq!(revised.version(), 2);
        assert_eq!(revised.name, "Smartphone Pro");
        assert_eq!(revised.timestamps.created_at, product.timestamps.created_at);
    }

    #[test]
    fn revise_validates_like_create() {
        let product = Product::create(ProductId::new(), draft(), Utc::now()).unwrap();
        let mut d = product.to_draft();
        d.min_purchase_qty = 0;
        assert!(product.revise(d, Utc::now()).is_err());
    }

    #[test]
    fn tags_are_normalized() {
        let mut d = draft();
        d.tags = vec![" phone".into(), "phone".into(), "".into(), "5g ".into()];
        let product = Product::create(ProductId::new(), d, Utc::now()).unwrap();
        assert_eq!(product.tags.len(), 2);
        assert!(product.has_tag("phone"));
        assert!(product.has_tag(" 5g"));
    }

    #[test]
    fn blank_description_becomes_none() {
        let mut d = draft();
        d.description = Some("  ".to_string());
        let product = Product::create(ProductId::new(), d, Utc::now()).unwrap();
        assert_eq!(product.description, None);
    }
}
