//! Admin surface of the catalog: menu registry, list pages and the display
//! glue they render.

pub mod list_view;
pub mod projections;
pub mod registry;

#[cfg(test)]
mod testing;

pub use list_view::{ListRow, ListView, ListViewBuilder, ListViewError};
pub use projections::{
    PriceLine, PriceSummary, escape_html, load_price_summary, price_lines, price_summary, render_image_preview,
    render_price_summary, render_thumbnail, render_video,
};
pub use registry::{
    AdminEntity, AdminGroup, AdminRegistry, CATALOG_ADMIN, Column, DerivedView, ModelAdmin, RegistryError,
};
