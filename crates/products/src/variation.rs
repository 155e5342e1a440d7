//! Product variations and the join records tying them to attributes and colours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{DomainResult, Entity, Timestamps};

use crate::product::ProductId;
use crate::reference::{AttributeId, ColorId};
use crate::validate;

catalog_core::uuid_id!(ProductVariationId, "ProductVariationId");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationDraft {
    pub product_id: ProductId,
    pub label: Option<String>,
    pub attribute_ids: Vec<AttributeId>,
    pub color_ids: Vec<ColorId>,
}

impl VariationDraft {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            label: None,
            attribute_ids: Vec::new(),
            color_ids: Vec::new(),
        }
    }
}

/// A named combination of attribute and colour selections for one product.
///
/// The selections themselves are [`VariationAttribute`] / [`VariationColor`]
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariation {
    pub id: ProductVariationId,
    pub product_id: ProductId,
    pub label: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl ProductVariation {
    pub const MAX_LABEL_LEN: usize = 100;

    pub fn create(product_id: ProductId, label: Option<&str>, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ProductVariationId::new(),
            product_id,
            label: validate::optional_text("label", label, Some(Self::MAX_LABEL_LEN))?,
            timestamps: Timestamps::at(now),
        })
    }
}

impl Entity for ProductVariation {
    type Id = ProductVariationId;

    fn id(&self) -> &ProductVariationId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}

impl core::fmt::Display for ProductVariation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.label {
            Some(label) => f.write_str(label),
            None => write!(f, "ProductVariation ID: {}", self.id),
        }
    }
}

/// Variation ↔ Attribute relation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationAttribute {
    pub variation_id: ProductVariationId,
    pub attribute_id: AttributeId,
    pub created_at: DateTime<Utc>,
}

/// Variation ↔ Color relation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationColor {
    pub variation_id: ProductVariationId,
    pub color_id: ColorId,
    pub created_at: DateTime<Utc>,
}

/// Outcome of attaching a relation that may already exist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attached {
    Added,
    AlreadyPresent,
}

impl Attached {
    pub fn was_added(self) -> bool {
        self == Attached::Added
    }
}
