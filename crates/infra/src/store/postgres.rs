//! Postgres-backed catalog store.
//!
//! Schema lives in `crates/infra/migrations`. Delete cascades are carried by
//! `ON DELETE CASCADE` foreign keys; every multi-statement write runs in one
//! transaction.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error code | StoreError |
//! |---|---|
//! | `23503` foreign key violation | `Integrity` |
//! | `23505` unique violation | `Domain(Conflict)` |
//! | `23514` check violation | `Domain(Validation)` |
//! | anything else, pool closed, IO | `Backend` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

use catalog_core::{DomainError, ExpectedVersion, Timestamps};
use catalog_products::{
    Attached, Attribute, AttributeId, Brand, Category, Color, ColorId, HexColor, ImageDraft, ImageRef, PriceDetail,
    PriceDraft, Product, ProductDetail, ProductDraft, ProductId, ProductImage, ProductImageId, ProductPrice,
    ProductPriceId, ProductVariation, ProductVariationId, ProductVideo, ProductVideoId, Reference, VariationDetail,
    VariationDraft, VideoDraft, VideoEntry, VideoLink, VideoProvider, ensure_attribute_subset,
};

use super::{CatalogStore, ProductFilter};
use crate::error::{StoreError, StoreResult};

const PRODUCT_COLUMNS: &str = "id, name, category_id, brand_id, description, weight_kg, min_purchase_qty, \
     barcode, refundable, base_price, tags, version, created_at, updated_at";

const DETAIL_SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

const PRICE_COLUMNS: &str =
    "p.id, p.variation_id, p.unit_price, p.discount, p.discount_start_date, p.discount_end_date, p.created_at, p.updated_at";

/// Postgres-backed catalog store.
///
/// `Send + Sync`; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        info!(max_connections, "connecting to catalog database");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("running catalog migrations");
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::backend(format!("migration failed: {e}")))?;
        info!("catalog migrations complete");
        Ok(())
    }

    async fn fetch_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::uuid IS NULL OR category_id = $1) \
               AND ($2::uuid IS NULL OR brand_id = $2) \
               AND ($3::text IS NULL OR $3 = ANY(tags)) \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.category_id.map(Uuid::from))
            .bind(filter.brand_id.map(Uuid::from))
            .bind(filter.tag.as_deref().map(str::trim))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, record), fields(kind = R::KIND.table()), err)]
    async fn insert_reference<R: Reference>(&self, record: R) -> StoreResult<R> {
        let sql = format!(
            "INSERT INTO {} (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
            R::KIND.table()
        );
        let stamps = record.timestamps();
        sqlx::query(&sql)
            .bind(Into::<Uuid>::into(record.reference_id()))
            .bind(record.name())
            .bind(stamps.created_at)
            .bind(stamps.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_reference", e))?;
        Ok(record)
    }

    #[instrument(skip(self), fields(kind = R::KIND.table()), err)]
    async fn get_reference<R: Reference>(&self, id: R::Id) -> StoreResult<Option<R>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} WHERE id = $1",
            R::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(Into::<Uuid>::into(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_reference", e))?;
        row.as_ref().map(reference_from_row::<R>).transpose()
    }

    #[instrument(skip(self), fields(kind = R::KIND.table()), err)]
    async fn find_reference<R: Reference>(&self, name: &str) -> StoreResult<Option<R>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} WHERE name = $1 ORDER BY created_at, id LIMIT 1",
            R::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_reference", e))?;
        row.as_ref().map(reference_from_row::<R>).transpose()
    }

    #[instrument(skip(self), fields(kind = R::KIND.table()), err)]
    async fn list_references<R: Reference>(&self) -> StoreResult<Vec<R>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at FROM {} ORDER BY created_at, id",
            R::KIND.table()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_references", e))?;
        rows.iter().map(reference_from_row::<R>).collect()
    }

    #[instrument(skip(self), fields(kind = R::KIND.table()), err)]
    async fn rename_reference<R: Reference>(&self, id: R::Id, name: &str) -> StoreResult<Option<R>> {
        let Some(current) = self.get_reference::<R>(id).await? else {
            return Ok(None);
        };
        let renamed = current.renamed(name, Utc::now())?;
        let sql = format!(
            "UPDATE {} SET name = $2, updated_at = $3 WHERE id = $1",
            R::KIND.table()
        );
        let result = sqlx::query(&sql)
            .bind(Into::<Uuid>::into(id))
            .bind(renamed.name())
            .bind(renamed.timestamps().updated_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_reference", e))?;
        Ok((result.rows_affected() > 0).then_some(renamed))
    }

    #[instrument(skip(self), fields(kind = R::KIND.table()), err)]
    async fn delete_reference<R: Reference>(&self, id: R::Id) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", R::KIND.table());
        let result = sqlx::query(&sql)
            .bind(Into::<Uuid>::into(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_reference", e))?;
        debug!(rows = result.rows_affected(), "reference deleted (dependents cascade)");
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, color), fields(color_id = %color.id), err)]
    async fn insert_color(&self, color: Color) -> StoreResult<Color> {
        sqlx::query(
            "INSERT INTO colors (id, name, color_code, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(color.id))
        .bind(&color.name)
        .bind(color.color_code.as_str())
        .bind(color.timestamps.created_at)
        .bind(color.timestamps.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_color", e))?;
        Ok(color)
    }

    #[instrument(skip(self), err)]
    async fn get_color(&self, id: ColorId) -> StoreResult<Option<Color>> {
        let row = sqlx::query("SELECT id, name, color_code, created_at, updated_at FROM colors WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_color", e))?;
        row.as_ref().map(color_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_colors(&self) -> StoreResult<Vec<Color>> {
        let rows = sqlx::query("SELECT id, name, color_code, created_at, updated_at FROM colors ORDER BY created_at, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_colors", e))?;
        rows.iter().map(color_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_color(&self, id: ColorId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM colors WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_color", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, draft), fields(product_id = tracing::field::Empty), err)]
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let product = Product::create(ProductId::new(), draft, Utc::now())?;
        Span::current().record("product_id", tracing::field::display(product.id));

        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        bind_product(sqlx::query(&sql), &product)?
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self, draft), fields(product_id = %id, expected = ?expected), err)]
    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
        expected: ExpectedVersion,
    ) -> StoreResult<Option<Product>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let current = product_from_row(&row)?;
        expected.check(current.version)?;
        let revised = current.revise(draft, Utc::now())?;

        let update = sqlx::query(
            "UPDATE products SET name = $2, category_id = $3, brand_id = $4, description = $5, weight_kg = $6, \
             min_purchase_qty = $7, barcode = $8, refundable = $9, base_price = $10, tags = $11, version = $12, \
             created_at = $13, updated_at = $14 WHERE id = $1",
        );
        bind_product(update, &revised)?
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(Some(revised))
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.fetch_products(filter).await
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        debug!(product_id = %id, rows = result.rows_affected(), "product deleted (owned records cascade)");
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn load_product_detail(&self, id: ProductId) -> StoreResult<Option<ProductDetail>> {
        let op = "load_product_detail";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;
        // Every SELECT below must see the same snapshot.
        sqlx::query(DETAIL_SNAPSHOT)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        let pid = Uuid::from(id);

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(pid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?
        else {
            return Ok(None);
        };
        let product = product_from_row(&row)?;

        let category_row = sqlx::query("SELECT id, name, created_at, updated_at FROM categories WHERE id = $1")
            .bind(Uuid::from(product.category_id))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        let category = reference_from_row::<Category>(&category_row)?;

        let brand_row = sqlx::query("SELECT id, name, created_at, updated_at FROM brands WHERE id = $1")
            .bind(Uuid::from(product.brand_id))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        let brand = reference_from_row::<Brand>(&brand_row)?;

        let images = sqlx::query(
            "SELECT id, product_id, image, is_thumbnail, description, created_at, updated_at \
             FROM product_images WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(image_from_row)
        .collect::<StoreResult<Vec<_>>>()?;

        let video_rows = sqlx::query(
            "SELECT v.id, v.product_id, v.provider_id, v.video_link, v.created_at, v.updated_at, \
                    vp.name AS provider_name, vp.created_at AS provider_created_at, \
                    vp.updated_at AS provider_updated_at \
             FROM product_videos v JOIN video_providers vp ON vp.id = v.provider_id \
             WHERE v.product_id = $1 ORDER BY v.created_at, v.id",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;
        let mut videos = Vec::with_capacity(video_rows.len());
        for row in &video_rows {
            let video = video_from_row(row)?;
            let provider = VideoProvider::restore(
                video.provider_id,
                col(row, "provider_name")?,
                Timestamps {
                    created_at: col(row, "provider_created_at")?,
                    updated_at: col(row, "provider_updated_at")?,
                },
            );
            videos.push(VideoEntry { video, provider });
        }

        let variations = sqlx::query(
            "SELECT id, product_id, label, created_at, updated_at FROM product_variations \
             WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(variation_from_row)
        .collect::<StoreResult<Vec<_>>>()?;

        let variation_attributes = sqlx::query(
            "SELECT va.variation_id AS owner_id, a.id, a.name, a.created_at, a.updated_at \
             FROM variation_attributes va \
             JOIN attributes a ON a.id = va.attribute_id \
             JOIN product_variations v ON v.id = va.variation_id \
             WHERE v.product_id = $1 ORDER BY va.seq",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(|row| Ok((col::<Uuid>(row, "owner_id")?, reference_from_row::<Attribute>(row)?)))
        .collect::<StoreResult<Vec<_>>>()?;

        let variation_colors = sqlx::query(
            "SELECT vc.variation_id AS owner_id, c.id, c.name, c.color_code, c.created_at, c.updated_at \
             FROM variation_colors vc \
             JOIN colors c ON c.id = vc.color_id \
             JOIN product_variations v ON v.id = vc.variation_id \
             WHERE v.product_id = $1 ORDER BY vc.seq",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(|row| Ok((col::<Uuid>(row, "owner_id")?, color_from_row(row)?)))
        .collect::<StoreResult<Vec<_>>>()?;

        let prices = sqlx::query(&format!(
            "SELECT {PRICE_COLUMNS} FROM product_prices p \
             JOIN product_variations v ON v.id = p.variation_id \
             WHERE v.product_id = $1 ORDER BY p.created_at, p.id"
        ))
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(price_from_row)
        .collect::<StoreResult<Vec<_>>>()?;

        let price_attributes = sqlx::query(
            "SELECT pa.price_id AS owner_id, a.id, a.name, a.created_at, a.updated_at \
             FROM price_attributes pa \
             JOIN attributes a ON a.id = pa.attribute_id \
             JOIN product_prices p ON p.id = pa.price_id \
             JOIN product_variations v ON v.id = p.variation_id \
             WHERE v.product_id = $1 ORDER BY pa.seq",
        )
        .bind(pid)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?
        .iter()
        .map(|row| Ok((col::<Uuid>(row, "owner_id")?, reference_from_row::<Attribute>(row)?)))
        .collect::<StoreResult<Vec<_>>>()?;

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;

        let variations = variations
            .into_iter()
            .map(|variation| {
                let vid = Uuid::from(variation.id);
                VariationDetail {
                    attributes: owned_by(&variation_attributes, vid),
                    colors: owned_by(&variation_colors, vid),
                    prices: prices
                        .iter()
                        .filter(|p| p.variation_id == variation.id)
                        .map(|price| PriceDetail {
                            attributes: owned_by(&price_attributes, Uuid::from(price.id)),
                            price: price.clone(),
                        })
                        .collect(),
                    variation,
                }
            })
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

    #[instrument(skip(self, draft), fields(product_id = %draft.product_id), err)]
    async fn add_image(&self, draft: ImageDraft) -> StoreResult<ProductImage> {
        let image = ProductImage::create(draft, Utc::now())?;
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("add_image", e))?;

        if image.is_thumbnail {
            let existing = sqlx::query("SELECT 1 FROM product_images WHERE product_id = $1 AND is_thumbnail")
                .bind(Uuid::from(image.product_id))
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("add_image", e))?;
            if existing.is_some() {
                return Err(DomainError::invariant(format!(
                    "product {} already has a thumbnail image",
                    image.product_id
                ))
                .into());
            }
        }

        sqlx::query(
            "INSERT INTO product_images (id, product_id, image, is_thumbnail, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(image.id))
        .bind(Uuid::from(image.product_id))
        .bind(image.image.as_str())
        .bind(image.is_thumbnail)
        .bind(image.description.as_deref())
        .bind(image.timestamps.created_at)
        .bind(image.timestamps.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_image", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("add_image", e))?;
        Ok(image)
    }

    #[instrument(skip(self), err)]
    async fn list_images(&self, product_id: ProductId) -> StoreResult<Vec<ProductImage>> {
        let rows = sqlx::query(
            "SELECT id, product_id, image, is_thumbnail, description, created_at, updated_at \
             FROM product_images WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(Uuid::from(product_id))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_images", e))?;
        rows.iter().map(image_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn set_thumbnail(&self, product_id: ProductId, image_id: ProductImageId) -> StoreResult<bool> {
        let op = "set_thumbnail";
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let owned = sqlx::query("SELECT 1 FROM product_images WHERE id = $1 AND product_id = $2 FOR UPDATE")
            .bind(Uuid::from(image_id))
            .bind(Uuid::from(product_id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        if owned.is_none() {
            return Ok(false);
        }

        // Clear first: the partial unique index allows one thumbnail at a time.
        sqlx::query(
            "UPDATE product_images SET is_thumbnail = FALSE, updated_at = $3 \
             WHERE product_id = $1 AND is_thumbnail AND id <> $2",
        )
        .bind(Uuid::from(product_id))
        .bind(Uuid::from(image_id))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;

        sqlx::query("UPDATE product_images SET is_thumbnail = TRUE, updated_at = $2 WHERE id = $1 AND NOT is_thumbnail")
            .bind(Uuid::from(image_id))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(true)
    }

    #[instrument(skip(self), err)]
    async fn delete_image(&self, id: ProductImageId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_image", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, draft), fields(product_id = %draft.product_id), err)]
    async fn add_video(&self, draft: VideoDraft) -> StoreResult<ProductVideo> {
        let video = ProductVideo::create(draft, Utc::now())?;
        sqlx::query(
            "INSERT INTO product_videos (id, product_id, provider_id, video_link, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(video.id))
        .bind(Uuid::from(video.product_id))
        .bind(Uuid::from(video.provider_id))
        .bind(video.video_link.as_ref().map(VideoLink::as_str))
        .bind(video.timestamps.created_at)
        .bind(video.timestamps.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_video", e))?;
        Ok(video)
    }

    #[instrument(skip(self), err)]
    async fn list_videos(&self, product_id: ProductId) -> StoreResult<Vec<ProductVideo>> {
        let rows = sqlx::query(
            "SELECT id, product_id, provider_id, video_link, created_at, updated_at \
             FROM product_videos WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(Uuid::from(product_id))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_videos", e))?;
        rows.iter().map(video_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_video(&self, id: ProductVideoId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM product_videos WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_video", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, draft), fields(product_id = %draft.product_id), err)]
    async fn add_variation(&self, draft: VariationDraft) -> StoreResult<ProductVariation> {
        let op = "add_variation";
        let now = Utc::now();
        let variation = ProductVariation::create(draft.product_id, draft.label.as_deref(), now)?;
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        sqlx::query(
            "INSERT INTO product_variations (id, product_id, label, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(variation.id))
        .bind(Uuid::from(variation.product_id))
        .bind(variation.label.as_deref())
        .bind(variation.timestamps.created_at)
        .bind(variation.timestamps.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;

        for attribute_id in &draft.attribute_ids {
            sqlx::query(
                "INSERT INTO variation_attributes (variation_id, attribute_id, created_at) \
                 VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::from(variation.id))
            .bind(Uuid::from(*attribute_id))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        }
        for color_id in &draft.color_ids {
            sqlx::query(
                "INSERT INTO variation_colors (variation_id, color_id, created_at) \
                 VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::from(variation.id))
            .bind(Uuid::from(*color_id))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(variation)
    }

    #[instrument(skip(self), err)]
    async fn list_variations(&self, product_id: ProductId) -> StoreResult<Vec<ProductVariation>> {
        let rows = sqlx::query(
            "SELECT id, product_id, label, created_at, updated_at FROM product_variations \
             WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(Uuid::from(product_id))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_variations", e))?;
        rows.iter().map(variation_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn attach_attribute(
        &self,
        variation_id: ProductVariationId,
        attribute_id: AttributeId,
    ) -> StoreResult<Attached> {
        let result = sqlx::query(
            "INSERT INTO variation_attributes (variation_id, attribute_id, created_at) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::from(variation_id))
        .bind(Uuid::from(attribute_id))
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("attach_attribute", e))?;
        Ok(attached(result.rows_affected()))
    }

    #[instrument(skip(self), err)]
    async fn detach_attribute(
        &self,
        variation_id: ProductVariationId,
        attribute_id: AttributeId,
    ) -> StoreResult<bool> {
        let op = "detach_attribute";
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let in_use = sqlx::query(
            "SELECT 1 FROM price_attributes pa JOIN product_prices p ON p.id = pa.price_id \
             WHERE p.variation_id = $1 AND pa.attribute_id = $2 LIMIT 1",
        )
        .bind(Uuid::from(variation_id))
        .bind(Uuid::from(attribute_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;
        if in_use.is_some() {
            return Err(DomainError::invariant(format!(
                "attribute {attribute_id} still narrows a price row of variation {variation_id}"
            ))
            .into());
        }

        let result = sqlx::query("DELETE FROM variation_attributes WHERE variation_id = $1 AND attribute_id = $2")
            .bind(Uuid::from(variation_id))
            .bind(Uuid::from(attribute_id))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn attach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<Attached> {
        let result = sqlx::query(
            "INSERT INTO variation_colors (variation_id, color_id, created_at) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::from(variation_id))
        .bind(Uuid::from(color_id))
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("attach_color", e))?;
        Ok(attached(result.rows_affected()))
    }

    #[instrument(skip(self), err)]
    async fn detach_color(&self, variation_id: ProductVariationId, color_id: ColorId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM variation_colors WHERE variation_id = $1 AND color_id = $2")
            .bind(Uuid::from(variation_id))
            .bind(Uuid::from(color_id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("detach_color", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn delete_variation(&self, id: ProductVariationId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM product_variations WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_variation", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, draft), fields(variation_id = %draft.variation_id), err)]
    async fn add_price(&self, draft: PriceDraft) -> StoreResult<ProductPrice> {
        let op = "add_price";
        let now = Utc::now();
        let price = ProductPrice::create(&draft, now)?;
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let variation = sqlx::query("SELECT 1 FROM product_variations WHERE id = $1 FOR SHARE")
            .bind(Uuid::from(price.variation_id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        if variation.is_none() {
            return Err(StoreError::integrity(format!(
                "variation {} does not exist",
                price.variation_id
            )));
        }

        let allowed = sqlx::query("SELECT attribute_id FROM variation_attributes WHERE variation_id = $1")
            .bind(Uuid::from(price.variation_id))
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?
            .iter()
            .map(|row| col::<Uuid>(row, "attribute_id").map(AttributeId::from))
            .collect::<StoreResult<Vec<_>>>()?;
        ensure_attribute_subset(&draft.attribute_ids, &allowed)?;

        sqlx::query(
            "INSERT INTO product_prices (id, variation_id, unit_price, discount, discount_start_date, \
             discount_end_date, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(price.id))
        .bind(Uuid::from(price.variation_id))
        .bind(price.unit_price)
        .bind(price.discount)
        .bind(price.discount_start_date)
        .bind(price.discount_end_date)
        .bind(price.timestamps.created_at)
        .bind(price.timestamps.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(op, e))?;

        for attribute_id in &draft.attribute_ids {
            sqlx::query(
                "INSERT INTO price_attributes (price_id, attribute_id, created_at) \
                 VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::from(price.id))
            .bind(Uuid::from(*attribute_id))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;
        Ok(price)
    }

    #[instrument(skip(self), err)]
    async fn list_prices(&self, variation_id: ProductVariationId) -> StoreResult<Vec<ProductPrice>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRICE_COLUMNS} FROM product_prices p WHERE p.variation_id = $1 ORDER BY p.created_at, p.id"
        ))
        .bind(Uuid::from(variation_id))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_prices", e))?;
        rows.iter().map(price_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_price(&self, id: ProductPriceId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM product_prices WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_price", e))?;
        Ok(result.rows_affected() > 0)
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

/// Bind every product column in `PRODUCT_COLUMNS` order.
fn bind_product<'q>(query: PgQuery<'q>, product: &Product) -> StoreResult<PgQuery<'q>> {
    let min_purchase_qty = i32::try_from(product.min_purchase_qty)
        .map_err(|_| DomainError::validation("min_purchase_qty is out of range"))?;
    let version = i64::try_from(product.version).map_err(|_| StoreError::backend("product version overflow"))?;
    Ok(query
        .bind(Uuid::from(product.id))
        .bind(product.name.clone())
        .bind(Uuid::from(product.category_id))
        .bind(Uuid::from(product.brand_id))
        .bind(product.description.clone())
        .bind(product.weight_kg)
        .bind(min_purchase_qty)
        .bind(product.barcode.clone())
        .bind(product.refundable)
        .bind(product.base_price)
        .bind(product.tags.iter().cloned().collect::<Vec<String>>())
        .bind(version)
        .bind(product.timestamps.created_at)
        .bind(product.timestamps.updated_at))
}

fn attached(rows_affected: u64) -> Attached {
    if rows_affected > 0 {
        Attached::Added
    } else {
        Attached::AlreadyPresent
    }
}

fn owned_by<T: Clone>(rows: &[(Uuid, T)], owner: Uuid) -> Vec<T> {
    rows.iter()
        .filter(|(id, _)| *id == owner)
        .map(|(_, record)| record.clone())
        .collect()
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::backend(format!("failed to decode column {name}: {e}")))
}

fn corrupt(err: DomainError) -> StoreError {
    StoreError::backend(format!("stored row failed validation: {err}"))
}

fn timestamps(row: &PgRow) -> StoreResult<Timestamps> {
    Ok(Timestamps {
        created_at: col::<DateTime<Utc>>(row, "created_at")?,
        updated_at: col::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn reference_from_row<R: Reference>(row: &PgRow) -> StoreResult<R> {
    Ok(R::restore(
        <R::Id as From<Uuid>>::from(col(row, "id")?),
        col(row, "name")?,
        timestamps(row)?,
    ))
}

fn color_from_row(row: &PgRow) -> StoreResult<Color> {
    Ok(Color {
        id: col::<Uuid>(row, "id")?.into(),
        name: col(row, "name")?,
        color_code: HexColor::parse(&col::<String>(row, "color_code")?).map_err(corrupt)?,
        timestamps: timestamps(row)?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let min_purchase_qty: i32 = col(row, "min_purchase_qty")?;
    let version: i64 = col(row, "version")?;
    let tags: Vec<String> = col(row, "tags")?;
    Ok(Product {
        id: col::<Uuid>(row, "id")?.into(),
        name: col(row, "name")?,
        category_id: col::<Uuid>(row, "category_id")?.into(),
        brand_id: col::<Uuid>(row, "brand_id")?.into(),
        description: col(row, "description")?,
        weight_kg: col::<Option<Decimal>>(row, "weight_kg")?,
        min_purchase_qty: u32::try_from(min_purchase_qty)
            .map_err(|_| StoreError::backend(format!("invalid min_purchase_qty {min_purchase_qty}")))?,
        barcode: col(row, "barcode")?,
        refundable: col(row, "refundable")?,
        base_price: col(row, "base_price")?,
        tags: tags.into_iter().collect(),
        version: u64::try_from(version).map_err(|_| StoreError::backend(format!("invalid version {version}")))?,
        timestamps: timestamps(row)?,
    })
}

fn image_from_row(row: &PgRow) -> StoreResult<ProductImage> {
    Ok(ProductImage {
        id: col::<Uuid>(row, "id")?.into(),
        product_id: col::<Uuid>(row, "product_id")?.into(),
        image: ImageRef::parse(&col::<String>(row, "image")?).map_err(corrupt)?,
        is_thumbnail: col(row, "is_thumbnail")?,
        description: col(row, "description")?,
        timestamps: timestamps(row)?,
    })
}

fn video_from_row(row: &PgRow) -> StoreResult<ProductVideo> {
    let link: Option<String> = col(row, "video_link")?;
    Ok(ProductVideo {
        id: col::<Uuid>(row, "id")?.into(),
        product_id: col::<Uuid>(row, "product_id")?.into(),
        provider_id: col::<Uuid>(row, "provider_id")?.into(),
        video_link: link.as_deref().map(VideoLink::parse).transpose().map_err(corrupt)?,
        timestamps: timestamps(row)?,
    })
}

fn variation_from_row(row: &PgRow) -> StoreResult<ProductVariation> {
    Ok(ProductVariation {
        id: col::<Uuid>(row, "id")?.into(),
        product_id: col::<Uuid>(row, "product_id")?.into(),
        label: col(row, "label")?,
        timestamps: timestamps(row)?,
    })
}

fn price_from_row(row: &PgRow) -> StoreResult<ProductPrice> {
    Ok(ProductPrice {
        id: col::<Uuid>(row, "id")?.into(),
        variation_id: col::<Uuid>(row, "variation_id")?.into(),
        unit_price: col(row, "unit_price")?,
        discount: col::<Option<Decimal>>(row, "discount")?,
        discount_start_date: col::<Option<NaiveDate>>(row, "discount_start_date")?,
        discount_end_date: col::<Option<NaiveDate>>(row, "discount_end_date")?,
        timestamps: timestamps(row)?,
    })
}

/// Map sqlx errors to `StoreError` by PostgreSQL error code.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StoreError::Integrity(msg),
                Some("23505") => DomainError::conflict(msg).into(),
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::integrity(format!("referenced row missing in {operation}")),
        _ => StoreError::backend(format!("sqlx error in {operation}: {err}")),
    }
}
