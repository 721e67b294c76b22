//! Catalog repository used by the CLI sync and maintenance commands.
//!
//! Image writes are restricted to `source = 'printful'` rows in SQL as well
//! as in the sync plan, so a custom image cannot be removed from here even by
//! a wrong id.

use sqlx::PgPool;
use uuid::Uuid;

use reform_shop_core::images::{ImageSyncPlan, ProductImage};
use reform_shop_core::{
    CatalogVariantId, Design, ImageId, ImageSource, PrintfulProductId, ProductId, ProductType,
    Size, SyncVariantId, VariantId,
};

use super::RepositoryError;

/// A product as seen by the sync jobs.
#[derive(Debug, Clone)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub product_type: ProductType,
    pub price_pence: i64,
    pub printful_product_id: Option<PrintfulProductId>,
    pub is_active: bool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    category: Option<String>,
    price_pence: i64,
    printful_product_id: Option<i64>,
    is_active: bool,
}

impl From<ProductRow> for CatalogProduct {
    fn from(row: ProductRow) -> Self {
        // Older rows carry free-text categories; fall back to the name heuristic.
        let product_type = row
            .category
            .as_deref()
            .and_then(|c| c.parse::<ProductType>().ok())
            .unwrap_or_else(|| ProductType::detect(&row.name, None));

        Self {
            id: ProductId::from(row.id),
            name: row.name,
            slug: row.slug,
            product_type,
            price_pence: row.price_pence,
            printful_product_id: row.printful_product_id.map(PrintfulProductId::new),
            is_active: row.is_active,
        }
    }
}

/// A stored variant with the fields the color fixer needs.
#[derive(Debug, Clone)]
pub struct CatalogVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub product_type: ProductType,
    pub catalog_variant_id: CatalogVariantId,
    pub color: String,
    pub color_hex: Option<String>,
    pub size: String,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    category: Option<String>,
    printful_variant_id: i64,
    color: String,
    color_hex: Option<String>,
    size: String,
}

impl From<VariantRow> for CatalogVariant {
    fn from(row: VariantRow) -> Self {
        let product_type = row
            .category
            .as_deref()
            .and_then(|c| c.parse::<ProductType>().ok())
            .unwrap_or_else(|| ProductType::detect(&row.product_name, None));

        Self {
            id: VariantId::from(row.id),
            product_id: ProductId::from(row.product_id),
            product_type,
            catalog_variant_id: CatalogVariantId::new(row.printful_variant_id),
            color: row.color,
            color_hex: row.color_hex,
            size: row.size,
        }
    }
}

/// Variant data written by the Printful sync.
#[derive(Debug, Clone)]
pub struct VariantUpsert {
    /// Catalog variant id; the conflict key.
    pub catalog_variant_id: CatalogVariantId,
    pub sync_variant_id: SyncVariantId,
    pub color: String,
    pub color_hex: Option<String>,
    pub size: Size,
    pub design: Option<Design>,
    pub external_id: Option<String>,
    pub sku: Option<String>,
    pub price_pence: i64,
    pub in_stock: bool,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    product_id: Uuid,
    image_url: String,
    image_order: i32,
    is_primary: bool,
    is_thumbnail: bool,
    source: String,
    color: Option<String>,
}

impl TryFrom<ImageRow> for ProductImage {
    type Error = RepositoryError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let source = row
            .source
            .parse::<ImageSource>()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid image source: {e}")))?;

        Ok(Self {
            id: ImageId::from(row.id),
            product_id: ProductId::from(row.product_id),
            image_url: row.image_url,
            image_order: row.image_order,
            is_primary: row.is_primary,
            is_thumbnail: row.is_thumbnail,
            source,
            color: row.color,
        })
    }
}

const IMAGE_COLUMNS: &str = r"
    id, product_id, image_url, image_order, is_primary, is_thumbnail, source, color
";

/// Repository for catalog tables.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products linked to a Printful sync product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn printful_products(&self) -> Result<Vec<CatalogProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, slug, category, price_pence, printful_product_id, is_active
            FROM shop.products
            WHERE is_active AND printful_product_id IS NOT NULL
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CatalogProduct::from).collect())
    }

    /// Every variant joined with its product's type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_variants(&self) -> Result<Vec<CatalogVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT v.id, v.product_id, p.name AS product_name, p.category,
                   v.printful_variant_id, v.color, v.color_hex, v.size
            FROM shop.product_variants v
            JOIN shop.products p ON p.id = v.product_id
            ORDER BY p.name, v.size, v.color
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CatalogVariant::from).collect())
    }

    /// Insert or update a variant keyed on its catalog variant id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the catalog id belongs to another product.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert_variant(
        &self,
        product_id: ProductId,
        variant: &VariantUpsert,
    ) -> Result<VariantId, RepositoryError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r"
            INSERT INTO shop.product_variants (
                product_id, printful_variant_id, printful_sync_variant_id, color, color_hex,
                size, design, external_id, sku, price_pence, in_stock, is_available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (printful_variant_id) DO UPDATE SET
                printful_sync_variant_id = EXCLUDED.printful_sync_variant_id,
                color = EXCLUDED.color,
                color_hex = COALESCE(EXCLUDED.color_hex, shop.product_variants.color_hex),
                size = EXCLUDED.size,
                design = EXCLUDED.design,
                external_id = EXCLUDED.external_id,
                sku = EXCLUDED.sku,
                price_pence = EXCLUDED.price_pence,
                in_stock = EXCLUDED.in_stock,
                is_available = EXCLUDED.is_available,
                updated_at = NOW()
            WHERE shop.product_variants.product_id = EXCLUDED.product_id
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(variant.catalog_variant_id)
        .bind(variant.sync_variant_id)
        .bind(&variant.color)
        .bind(&variant.color_hex)
        .bind(variant.size.as_str())
        .bind(variant.design.map(|d| d.as_str()))
        .bind(&variant.external_id)
        .bind(&variant.sku)
        .bind(variant.price_pence)
        .bind(variant.in_stock)
        .fetch_optional(self.pool)
        .await?;

        id.map(VariantId::from).ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "catalog variant {} is attached to another product",
                variant.catalog_variant_id
            ))
        })
    }

    /// Set a variant's display color.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    pub async fn update_color_hex(&self, id: VariantId, hex: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"UPDATE shop.product_variants SET color_hex = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(hex)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Images of one product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a row has an unknown source.
    pub async fn product_images(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM shop.product_images WHERE product_id = $1 ORDER BY image_order, created_at"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductImage::try_from).collect()
    }

    /// Every product image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a row has an unknown source.
    pub async fn all_images(&self) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM shop.product_images ORDER BY product_id, image_order"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductImage::try_from).collect()
    }

    /// Apply an image sync plan in one transaction.
    ///
    /// Deletes run first so a replaced primary image frees its flag before
    /// the new one takes it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is applied.
    pub async fn apply_image_plan(
        &self,
        product_id: ProductId,
        plan: &ImageSyncPlan,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !plan.delete.is_empty() {
            let ids: Vec<Uuid> = plan.delete.iter().map(|id| id.as_uuid()).collect();
            sqlx::query(
                r"
                DELETE FROM shop.product_images
                WHERE product_id = $1 AND id = ANY($2) AND source = 'printful'
                ",
            )
            .bind(product_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        }

        for image in &plan.insert {
            sqlx::query(
                r"
                INSERT INTO shop.product_images (
                    product_id, image_url, image_order, is_primary, is_thumbnail, source, color
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(product_id)
            .bind(&image.image_url)
            .bind(image.image_order)
            .bind(image.is_primary)
            .bind(image.is_thumbnail)
            .bind(image.source().as_str())
            .bind(&image.color)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
