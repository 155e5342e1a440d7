//! Labeled reference records: brands, categories, video providers, attributes
//! and colours.
//!
//! The first four are plain named tables and share one shape, generated by
//! `reference_record!`. Colours additionally carry a hex colour code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_core::{DomainError, DomainResult, Entity, Timestamps, ValueObject};

use crate::validate;

/// The name-only reference tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Brand,
    Category,
    VideoProvider,
    Attribute,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Brand,
        ReferenceKind::Category,
        ReferenceKind::VideoProvider,
        ReferenceKind::Attribute,
    ];

    /// Storage table name.
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Brand => "brands",
            ReferenceKind::Category => "categories",
            ReferenceKind::VideoProvider => "video_providers",
            ReferenceKind::Attribute => "attributes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReferenceKind::Brand => "Brand",
            ReferenceKind::Category => "Category",
            ReferenceKind::VideoProvider => "Video Provider",
            ReferenceKind::Attribute => "Attribute",
        }
    }

    pub fn plural_label(self) -> &'static str {
        match self {
            ReferenceKind::Brand => "Brands",
            ReferenceKind::Category => "Categories",
            ReferenceKind::VideoProvider => "Video Providers",
            ReferenceKind::Attribute => "Attributes",
        }
    }

    /// Maximum length of the `name` column.
    pub fn max_name_len(self) -> usize {
        match self {
            ReferenceKind::Attribute => 15,
            _ => 100,
        }
    }
}

/// Common interface of the name-only reference records.
///
/// Stores use it to keep all four tables behind one set of generic operations.
pub trait Reference: Clone + core::fmt::Debug + core::fmt::Display + Send + Sync + 'static {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + From<Uuid> + Into<Uuid> + 'static;

    const KIND: ReferenceKind;

    /// Rebuild a record from stored columns (no validation).
    fn restore(id: Self::Id, name: String, timestamps: Timestamps) -> Self;

    fn reference_id(&self) -> Self::Id;

    fn name(&self) -> &str;

    fn timestamps(&self) -> Timestamps;

    /// Create a new record with a fresh id.
    fn create(name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate::required_text("name", name, Self::KIND.max_name_len())?;
        let id = <Self::Id as From<Uuid>>::from(Uuid::now_v7());
        Ok(Self::restore(id, name, Timestamps::at(now)))
    }

    /// Copy of this record carrying a new name.
    fn renamed(&self, name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate::required_text("name", name, Self::KIND.max_name_len())?;
        Ok(Self::restore(self.reference_id(), name, self.timestamps().touched(now)))
    }
}

macro_rules! reference_record {
    ($(#[$meta:meta])* $t:ident, $id:ident, $kind:expr) => {
        catalog_core::uuid_id!($id, stringify!($id));

        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $t {
            pub id: $id,
            pub name: String,
            #[serde(flatten)]
            pub timestamps: Timestamps,
        }

        impl $t {
            pub fn new(name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
                <Self as Reference>::create(name, now)
            }
        }

        impl Reference for $t {
            type Id = $id;

            const KIND: ReferenceKind = $kind;

            fn restore(id: $id, name: String, timestamps: Timestamps) -> Self {
                Self { id, name, timestamps }
            }

            fn reference_id(&self) -> $id {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn timestamps(&self) -> Timestamps {
                self.timestamps
            }
        }

        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> &$id {
                &self.id
            }

            fn recorded(&self) -> Timestamps {
                self.timestamps
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.name)
            }
        }
    };
}

reference_record!(
    /// A product brand ("Nike").
    Brand,
    BrandId,
    ReferenceKind::Brand
);
reference_record!(
    /// A product category ("Electronics").
    Category,
    CategoryId,
    ReferenceKind::Category
);
reference_record!(
    /// A video hosting service ("YouTube").
    VideoProvider,
    VideoProviderId,
    ReferenceKind::VideoProvider
);
reference_record!(
    /// A selectable product dimension ("size", "color").
    Attribute,
    AttributeId,
    ReferenceKind::Attribute
);

catalog_core::uuid_id!(ColorId, "ColorId");

/// Hexadecimal colour code, normalised to `#` followed by uppercase digits.
///
/// Accepts an optional leading `#` and 3 (`RGB`), 6 (`RRGGBB`) or 8 (`RRGGBBAA`) digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(input: &str) -> DomainResult<Self> {
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !matches!(digits.len(), 3 | 6 | 8) {
            return Err(DomainError::validation(format!(
                "color_code must have 3, 6 or 8 hex digits (got {input:?})"
            )));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::validation(format!(
                "color_code is not hexadecimal: {input:?}"
            )));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

impl core::fmt::Display for HexColor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for HexColor {}

/// A named colour a variation can be offered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
    pub color_code: HexColor,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Color {
    pub const MAX_NAME_LEN: usize = 12;

    pub fn new(name: &str, color_code: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ColorId::new(),
            name: validate::required_text("name", name, Self::MAX_NAME_LEN)?,
            color_code: HexColor::parse(color_code)?,
            timestamps: Timestamps::at(now),
        })
    }
}

impl Entity for Color {
    type Id = ColorId;

    fn id(&self) -> &ColorId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}

impl core::fmt::Display for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}
