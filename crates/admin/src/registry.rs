//! Admin menu and list-page configuration.
//!
//! The whole configuration is one static table, [`CATALOG_ADMIN`]. Nothing is
//! registered at runtime: [`AdminRegistry::load`] validates the table once at
//! startup and is the only way to reach an entry.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Every record type with an admin list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminEntity {
    Product,
    Brand,
    Category,
    VideoProvider,
    Attribute,
    Color,
    ProductImage,
    ProductVideo,
    ProductVariation,
    ProductPrice,
}

impl AdminEntity {
    pub const ALL: [AdminEntity; 10] = [
        AdminEntity::Product,
        AdminEntity::Brand,
        AdminEntity::Category,
        AdminEntity::VideoProvider,
        AdminEntity::Attribute,
        AdminEntity::Color,
        AdminEntity::ProductImage,
        AdminEntity::ProductVideo,
        AdminEntity::ProductVariation,
        AdminEntity::ProductPrice,
    ];

    /// URL-style identifier ("product_image").
    pub fn slug(self) -> &'static str {
        match self {
            AdminEntity::Product => "product",
            AdminEntity::Brand => "brand",
            AdminEntity::Category => "category",
            AdminEntity::VideoProvider => "video_provider",
            AdminEntity::Attribute => "attribute",
            AdminEntity::Color => "color",
            AdminEntity::ProductImage => "product_image",
            AdminEntity::ProductVideo => "product_video",
            AdminEntity::ProductVariation => "product_variation",
            AdminEntity::ProductPrice => "product_price",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.slug() == slug)
    }

    /// Stored fields a list column, filter or search may name.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            AdminEntity::Product => &[
                "id",
                "name",
                "category",
                "brand",
                "description",
                "weight",
                "min_purchase_qty",
                "barcode",
                "refundable",
                "base_price",
                "tags",
                "version",
                "created_at",
                "updated_at",
            ],
            AdminEntity::Brand | AdminEntity::Category | AdminEntity::VideoProvider | AdminEntity::Attribute => {
                &["id", "name", "created_at", "updated_at"]
            }
            AdminEntity::Color => &["id", "name", "color_code", "created_at", "updated_at"],
            AdminEntity::ProductImage => &[
                "id",
                "product",
                "image",
                "is_thumbnail",
                "description",
                "created_at",
                "updated_at",
            ],
            AdminEntity::ProductVideo => &[
                "id",
                "product",
                "video_provider",
                "video_link",
                "created_at",
                "updated_at",
            ],
            AdminEntity::ProductVariation => &["id", "product", "label", "created_at", "updated_at"],
            AdminEntity::ProductPrice => &[
                "id",
                "product_variation",
                "unit_price",
                "discount",
                "discount_start_date",
                "discount_end_date",
                "created_at",
                "updated_at",
            ],
        }
    }

    pub fn has_field(self, field: &str) -> bool {
        self.fields().iter().any(|f| *f == field)
    }
}

/// A column computed from related records rather than read from a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedView {
    /// Price summary of every variation of a product.
    Prices,
    /// The product's thumbnail as an `<img>` tag.
    ProductImage,
    /// The product's first video as a provider-labelled link.
    ProductVideo,
    /// Preview of an image row.
    ImageThumbnail,
    PriceAttributes,
    VariationAttributes,
    VariationColors,
}

impl DerivedView {
    /// The entity whose rows this view can render.
    pub fn entity(self) -> AdminEntity {
        match self {
            DerivedView::Prices | DerivedView::ProductImage | DerivedView::ProductVideo => AdminEntity::Product,
            DerivedView::ImageThumbnail => AdminEntity::ProductImage,
            DerivedView::PriceAttributes => AdminEntity::ProductPrice,
            DerivedView::VariationAttributes | DerivedView::VariationColors => AdminEntity::ProductVariation,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            DerivedView::Prices => "Prices",
            DerivedView::ProductImage => "Product Image",
            DerivedView::ProductVideo => "Product Video",
            DerivedView::ImageThumbnail => "Thumbnail",
            DerivedView::PriceAttributes | DerivedView::VariationAttributes => "Attributes",
            DerivedView::VariationColors => "Colors",
        }
    }
}

/// One `list_display` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Field(&'static str),
    Derived(DerivedView),
}

impl Column {
    /// Column heading ("created_at" → "Created At").
    pub fn header(self) -> String {
        match self {
            Column::Field("id") => "ID".to_string(),
            Column::Field(name) => humanize(name),
            Column::Derived(view) => view.header().to_string(),
        }
    }
}

fn humanize(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// List-page configuration of one entity.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelAdmin {
    pub entity: AdminEntity,
    pub menu_label: &'static str,
    pub menu_icon: &'static str,
    pub list_display: &'static [Column],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
}

/// A menu group of admin pages.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdminGroup {
    pub menu_label: &'static str,
    pub menu_icon: &'static str,
    pub items: &'static [ModelAdmin],
}

const TIMESTAMPED: &[Column] = &[Column::Field("name"), Column::Field("created_at"), Column::Field("updated_at")];

pub static CATALOG_ADMIN: AdminGroup = AdminGroup {
    menu_label: "Product",
    menu_icon: "desktop",
    items: &[
        ModelAdmin {
            entity: AdminEntity::Product,
            menu_label: "Products",
            menu_icon: "spinner",
            list_display: &[
                Column::Field("name"),
                Column::Field("category"),
                Column::Field("brand"),
                Column::Derived(DerivedView::Prices),
                Column::Field("created_at"),
                Column::Field("updated_at"),
                Column::Derived(DerivedView::ProductImage),
                Column::Derived(DerivedView::ProductVideo),
            ],
            list_filter: &["category", "brand", "tags"],
            search_fields: &["name", "barcode"],
        },
        ModelAdmin {
            entity: AdminEntity::Brand,
            menu_label: "Brands",
            menu_icon: "spinner",
            list_display: TIMESTAMPED,
            list_filter: &[],
            search_fields: &["name"],
        },
        ModelAdmin {
            entity: AdminEntity::Category,
            menu_label: "Categories",
            menu_icon: "spinner",
            list_display: TIMESTAMPED,
            list_filter: &[],
            search_fields: &["name"],
        },
        ModelAdmin {
            entity: AdminEntity::VideoProvider,
            menu_label: "Video Provider",
            menu_icon: "spinner",
            list_display: TIMESTAMPED,
            list_filter: &["name"],
            search_fields: &["name"],
        },
        ModelAdmin {
            entity: AdminEntity::Attribute,
            menu_label: "Attributes",
            menu_icon: "spinner",
            list_display: TIMESTAMPED,
            list_filter: &[],
            search_fields: &["name"],
        },
        ModelAdmin {
            entity: AdminEntity::Color,
            menu_label: "Colors",
            menu_icon: "spinner",
            list_display: &[
                Column::Field("name"),
                Column::Field("color_code"),
                Column::Field("created_at"),
                Column::Field("updated_at"),
            ],
            list_filter: &[],
            search_fields: &["name", "color_code"],
        },
        ModelAdmin {
            entity: AdminEntity::ProductImage,
            menu_label: "Product Images",
            menu_icon: "image",
            list_display: &[
                Column::Field("product"),
                Column::Field("is_thumbnail"),
                Column::Derived(DerivedView::ImageThumbnail),
                Column::Field("description"),
            ],
            list_filter: &["product", "is_thumbnail"],
            search_fields: &[],
        },
        ModelAdmin {
            entity: AdminEntity::ProductVideo,
            menu_label: "Product Video",
            menu_icon: "spinner",
            list_display: &[
                Column::Field("video_provider"),
                Column::Field("video_link"),
                Column::Field("created_at"),
                Column::Field("updated_at"),
            ],
            list_filter: &[],
            search_fields: &[],
        },
        ModelAdmin {
            entity: AdminEntity::ProductVariation,
            menu_label: "Product Variation",
            menu_icon: "spinner",
            list_display: &[
                Column::Field("product"),
                Column::Derived(DerivedView::VariationAttributes),
                Column::Derived(DerivedView::VariationColors),
                Column::Field("created_at"),
            ],
            list_filter: &[],
            search_fields: &[],
        },
        ModelAdmin {
            entity: AdminEntity::ProductPrice,
            menu_label: "Product Prices",
            menu_icon: "spinner",
            list_display: &[
                Column::Field("id"),
                Column::Field("product_variation"),
                Column::Derived(DerivedView::PriceAttributes),
                Column::Field("unit_price"),
                Column::Field("discount_start_date"),
                Column::Field("discount_end_date"),
                Column::Field("discount"),
                Column::Field("created_at"),
                Column::Field("updated_at"),
            ],
            list_filter: &[],
            search_fields: &[],
        },
    ],
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity {0:?} is registered more than once")]
    DuplicateEntity(AdminEntity),

    #[error("{entity:?} has no list columns")]
    EmptyListDisplay { entity: AdminEntity },

    #[error("{entity:?} {usage} names unknown field {field:?}")]
    UnknownField {
        entity: AdminEntity,
        usage: &'static str,
        field: &'static str,
    },

    #[error("{entity:?} lists derived view {view:?}, which belongs to {owner:?}")]
    MisplacedView {
        entity: AdminEntity,
        view: DerivedView,
        owner: AdminEntity,
    },
}

/// Validated view over an [`AdminGroup`].
#[derive(Debug, Clone, Copy)]
pub struct AdminRegistry {
    group: &'static AdminGroup,
}

impl AdminRegistry {
    /// Validate and expose [`CATALOG_ADMIN`].
    pub fn load() -> Result<Self, RegistryError> {
        Self::from_group(&CATALOG_ADMIN)
    }

    pub fn from_group(group: &'static AdminGroup) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for item in group.items {
            validate(item)?;
            if !seen.insert(item.entity) {
                return Err(RegistryError::DuplicateEntity(item.entity));
            }
        }
        info!(group = group.menu_label, pages = group.items.len(), "admin registry loaded");
        Ok(Self { group })
    }

    pub fn menu_label(&self) -> &'static str {
        self.group.menu_label
    }

    pub fn menu_icon(&self) -> &'static str {
        self.group.menu_icon
    }

    /// Pages in menu order.
    pub fn entries(&self) -> impl Iterator<Item = &'static ModelAdmin> {
        self.group.items.iter()
    }

    pub fn get(&self, entity: AdminEntity) -> Option<&'static ModelAdmin> {
        self.group.items.iter().find(|item| item.entity == entity)
    }
}

fn validate(item: &ModelAdmin) -> Result<(), RegistryError> {
    let entity = item.entity;
    if item.list_display.is_empty() {
        return Err(RegistryError::EmptyListDisplay { entity });
    }
    for column in item.list_display {
        match *column {
            Column::Field(field) if !entity.has_field(field) => {
                return Err(RegistryError::UnknownField {
                    entity,
                    usage: "list_display",
                    field,
                });
            }
            Column::Derived(view) if view.entity() != entity => {
                return Err(RegistryError::MisplacedView {
                    entity,
                    view,
                    owner: view.entity(),
                });
            }
            _ => {}
        }
    }
    for (usage, fields) in [("list_filter", item.list_filter), ("search_fields", item.search_fields)] {
        if let Some(&field) = fields.iter().find(|f| !entity.has_field(f)) {
            return Err(RegistryError::UnknownField { entity, usage, field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_admin_is_valid() {
        let registry = AdminRegistry::load().unwrap();
        assert_eq!(registry.menu_label(), "Product");
        assert_eq!(registry.menu_icon(), "desktop");
        assert_eq!(registry.entries().count(), AdminEntity::ALL.len());
        for entity in AdminEntity::ALL {
            assert!(registry.get(entity).is_some(), "{entity:?} missing from the registry");
        }
    }

    #[test]
    fn product_page_matches_menu() {
        let registry = AdminRegistry::load().unwrap();
        let products = registry.get(AdminEntity::Product).unwrap();
        assert_eq!(products.menu_label, "Products");
        assert_eq!(products.list_filter, &["category", "brand", "tags"]);
        let headers: Vec<String> = products.list_display.iter().map(|c| c.header()).collect();
        assert_eq!(
            headers,
            vec![
                "Name",
                "Category",
                "Brand",
                "Prices",
                "Created At",
                "Updated At",
                "Product Image",
                "Product Video"
            ]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        static BROKEN: AdminGroup = AdminGroup {
            menu_label: "Broken",
            menu_icon: "desktop",
            items: &[ModelAdmin {
                entity: AdminEntity::Brand,
                menu_label: "Brands",
                menu_icon: "spinner",
                list_display: &[Column::Field("name"), Column::Field("product_name")],
                list_filter: &[],
                search_fields: &[],
            }],
        };
        let err = AdminRegistry::from_group(&BROKEN).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownField {
                entity: AdminEntity::Brand,
                usage: "list_display",
                field: "product_name"
            }
        );
    }

    #[test]
    fn unknown_search_field_is_rejected() {
        static BROKEN: AdminGroup = AdminGroup {
            menu_label: "Broken",
            menu_icon: "desktop",
            items: &[ModelAdmin {
                entity: AdminEntity::Color,
                menu_label: "Colors",
                menu_icon: "spinner",
                list_display: &[Column::Field("name")],
                list_filter: &[],
                search_fields: &["hex"],
            }],
        };
        assert!(matches!(
            AdminRegistry::from_group(&BROKEN),
            Err(RegistryError::UnknownField { usage: "search_fields", .. })
        ));
    }

    #[test]
    fn duplicate_and_misplaced_entries_are_rejected() {
        static DUPLICATE: AdminGroup = AdminGroup {
            menu_label: "Dup",
            menu_icon: "desktop",
            items: &[
                ModelAdmin {
                    entity: AdminEntity::Brand,
                    menu_label: "Brands",
                    menu_icon: "spinner",
                    list_display: TIMESTAMPED,
                    list_filter: &[],
                    search_fields: &[],
                },
                ModelAdmin {
                    entity: AdminEntity::Brand,
                    menu_label: "Brands again",
                    menu_icon: "spinner",
                    list_display: TIMESTAMPED,
                    list_filter: &[],
                    search_fields: &[],
                },
            ],
        };
        assert_eq!(
            AdminRegistry::from_group(&DUPLICATE).unwrap_err(),
            RegistryError::DuplicateEntity(AdminEntity::Brand)
        );

        static MISPLACED: AdminGroup = AdminGroup {
            menu_label: "Misplaced",
            menu_icon: "desktop",
            items: &[ModelAdmin {
                entity: AdminEntity::Brand,
                menu_label: "Brands",
                menu_icon: "spinner",
                list_display: &[Column::Derived(DerivedView::Prices)],
                list_filter: &[],
                search_fields: &[],
            }],
        };
        assert!(matches!(
            AdminRegistry::from_group(&MISPLACED),
            Err(RegistryError::MisplacedView { .. })
        ));
    }

    #[test]
    fn slugs_round_trip() {
        for entity in AdminEntity::ALL {
            assert_eq!(AdminEntity::from_slug(entity.slug()), Some(entity));
        }
        assert_eq!(AdminEntity::from_slug("nope"), None);
    }

    #[test]
    fn field_headers() {
        assert_eq!(Column::Field("discount_start_date").header(), "Discount Start Date");
        assert_eq!(Column::Field("id").header(), "ID");
        assert_eq!(Column::Derived(DerivedView::ImageThumbnail).header(), "Thumbnail");
    }
}
