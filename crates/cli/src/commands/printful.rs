//! Printful sync and export commands.
//!
//! # Usage
//!
//! ```bash
//! # Mirror variants and mockup images into the shop database
//! rs-cli printful sync
//! rs-cli printful sync --dry-run
//!
//! # Write one variant table per product type
//! rs-cli printful export --out-dir data/variants
//! ```
//!
//! # Environment Variables
//!
//! - `PRINTFUL_TOKEN` - Printful API token
//! - `PRINTFUL_STORE_ID` - Store id, for tokens that cover several stores
//! - `FUNCTIONS_DATABASE_URL` (or `DATABASE_URL`) - `sync` only
//!
//! Sync writes variants keyed on the catalog variant id and only ever adds
//! or removes images whose source is `printful`; images uploaded by hand
//! survive every sync.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use reform_shop_core::images::{IncomingImage, plan_image_sync};
use reform_shop_core::{
    ColorPalette, Design, PrintfulProductId, ProductType, ReconciledVariant, Size, VariantTable,
};
use reform_shop_functions::config::PrintfulConfig;
use reform_shop_functions::db::catalog::{CatalogProduct, CatalogRepository, VariantUpsert};
use reform_shop_functions::printful::{CatalogVariant, PrintfulClient, SyncVariant};

use super::{CommandError, connect, write_file};

/// Fallback color name when neither Printful nor the variant name has one.
const DEFAULT_COLOR: &str = "Default";

#[derive(Debug, Default)]
struct SyncStats {
    variants: usize,
    skipped_variants: usize,
    images_added: usize,
    images_removed: usize,
    custom_preserved: usize,
}

/// Sync every linked product from Printful.
///
/// Vendor errors for one product are logged and that product is skipped.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is
/// unreachable, or any product failed to sync.
pub async fn sync(dry_run: bool, palette: &ColorPalette) -> Result<(), CommandError> {
    let printful_config = PrintfulConfig::from_env()?;
    let pool = connect().await?;
    let client = PrintfulClient::new(&printful_config)?;
    let repo = CatalogRepository::new(&pool);

    let products = repo.printful_products().await?;
    tracing::info!(products = products.len(), dry_run, "Starting Printful sync");

    let mut failed = 0usize;
    for product in &products {
        let Some(printful_id) = product.printful_product_id else {
            continue;
        };

        match sync_product(&client, &repo, palette, product, printful_id, dry_run).await {
            Ok(stats) => tracing::info!(
                product = %product.name,
                variants = stats.variants,
                skipped_variants = stats.skipped_variants,
                images_added = stats.images_added,
                images_removed = stats.images_removed,
                custom_images_preserved = stats.custom_preserved,
                "Product synced"
            ),
            Err(e) => {
                failed += 1;
                tracing::warn!(product = %product.name, error = %e, "Skipping product");
            }
        }
    }

    if failed > 0 {
        return Err(CommandError::Failed(format!(
            "{failed} of {} products failed to sync",
            products.len()
        )));
    }

    tracing::info!("Printful sync complete");
    Ok(())
}

async fn sync_product(
    client: &PrintfulClient,
    repo: &CatalogRepository<'_>,
    palette: &ColorPalette,
    product: &CatalogProduct,
    printful_id: PrintfulProductId,
    dry_run: bool,
) -> Result<SyncStats, CommandError> {
    let detail = client.store_product(printful_id).await?;
    let mut stats = SyncStats::default();
    let mut incoming = Vec::new();

    for variant in detail.sync_variants.iter().filter(|v| !v.is_ignored) {
        let catalog = match client.catalog_variant(variant.catalog_variant_id).await {
            Ok(catalog) => catalog,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    catalog_variant_id = %variant.catalog_variant_id,
                    "Catalog variant no longer exists"
                );
                stats.skipped_variants += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let upsert = variant_upsert(variant, &catalog, product, palette);

        if let Some(url) = variant.preview_url() {
            incoming.push(IncomingImage {
                url: url.to_string(),
                color: Some(upsert.color.clone()),
            });
        }

        if dry_run {
            tracing::info!(
                catalog_variant_id = %upsert.catalog_variant_id,
                color = %upsert.color,
                size = %upsert.size,
                color_hex = upsert.color_hex.as_deref().unwrap_or("-"),
                "Would upsert variant"
            );
        } else {
            repo.upsert_variant(product.id, &upsert).await?;
        }
        stats.variants += 1;
    }

    let existing = repo.product_images(product.id).await?;
    let plan = plan_image_sync(&existing, &incoming);
    stats.images_added = plan.insert.len();
    stats.images_removed = plan.delete.len();
    stats.custom_preserved = plan.preserved_custom;

    if !dry_run && !plan.is_empty() {
        repo.apply_image_plan(product.id, &plan).await?;
    }

    Ok(stats)
}

fn variant_upsert(
    variant: &SyncVariant,
    catalog: &CatalogVariant,
    product: &CatalogProduct,
    palette: &ColorPalette,
) -> VariantUpsert {
    let (color, size) = variant_attributes(variant, catalog);
    let color_hex = palette
        .resolve(product.product_type, &color, catalog.color_code.as_deref())
        .map(|c| c.hex);
    let design = infer_design(variant, product.product_type, &color, palette);

    VariantUpsert {
        catalog_variant_id: variant.catalog_variant_id,
        sync_variant_id: variant.id,
        color,
        color_hex,
        size,
        design: Some(design),
        external_id: variant.external_id.clone(),
        sku: variant.sku.clone(),
        price_pence: variant.retail_price_pence().unwrap_or(product.price_pence),
        in_stock: catalog.in_stock,
    }
}

/// Export one variant table per product type from the Printful store.
///
/// A product or variant Printful fails to return is logged and skipped;
/// the remaining tables are still written.
///
/// # Errors
///
/// Returns an error if the product list cannot be fetched, a file cannot be
/// written, or any product or variant was skipped.
pub async fn export(out_dir: &Path, palette: &ColorPalette) -> Result<(), CommandError> {
    let printful_config = PrintfulConfig::from_env()?;
    let client = PrintfulClient::new(&printful_config)?;
    export_tables(&client, out_dir, palette).await
}

async fn export_tables(
    client: &PrintfulClient,
    out_dir: &Path,
    palette: &ColorPalette,
) -> Result<(), CommandError> {
    let mut by_type: BTreeMap<ProductType, Vec<ReconciledVariant>> = BTreeMap::new();
    let mut failed = 0usize;

    for summary in client.store_products().await? {
        if summary.is_ignored {
            continue;
        }

        let detail = match client.store_product(summary.id).await {
            Ok(detail) => detail,
            Err(e) => {
                failed += 1;
                tracing::warn!(product = %summary.name, error = %e, "Skipping product");
                continue;
            }
        };
        let product_type =
            ProductType::detect(&summary.name, summary.external_id.as_deref());
        let rows = by_type.entry(product_type).or_default();

        for variant in detail.sync_variants.iter().filter(|v| !v.is_ignored) {
            let catalog = match client.catalog_variant(variant.catalog_variant_id).await {
                Ok(catalog) => catalog,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        product = %summary.name,
                        catalog_variant_id = %variant.catalog_variant_id,
                        error = %e,
                        "Skipping variant"
                    );
                    continue;
                }
            };
            let row = exported_variant(variant, &catalog, product_type, palette);

            // Two store products of one type can share a blank; first one wins.
            let clash = rows.iter().any(|r| {
                r.catalog_variant_id == row.catalog_variant_id
                    || (r.design == row.design
                        && r.size == row.size
                        && r.color.eq_ignore_ascii_case(&row.color))
            });
            if clash {
                tracing::warn!(
                    product = %summary.name,
                    variant = %row.key,
                    "Variant already exported for this product type"
                );
                continue;
            }
            rows.push(row);
        }
    }

    for (product_type, rows) in by_type {
        if rows.is_empty() {
            continue;
        }
        let table = VariantTable::new(rows)?;
        let path = out_dir.join(format!("{product_type}-variants.json"));
        let json = table.to_json_pretty().map_err(|source| CommandError::Json {
            path: path.clone(),
            source,
        })?;
        write_file(&path, &json)?;
        tracing::info!(%product_type, variants = table.len(), path = %path.display(), "Variant table written");
    }

    if failed > 0 {
        return Err(CommandError::Failed(format!(
            "{failed} products or variants skipped during export"
        )));
    }
    Ok(())
}

fn exported_variant(
    variant: &SyncVariant,
    catalog: &CatalogVariant,
    product_type: ProductType,
    palette: &ColorPalette,
) -> ReconciledVariant {
    let (color, size) = variant_attributes(variant, catalog);
    let design = infer_design(variant, product_type, &color, palette);
    let key = format!("{design}-{color}-{size}");

    ReconciledVariant {
        sku: variant.sku.clone().unwrap_or_else(|| key.clone()),
        key,
        catalog_variant_id: variant.catalog_variant_id,
        sync_variant_id: variant.id,
        design,
        size,
        color_hex: palette
            .resolve(product_type, &color, catalog.color_code.as_deref())
            .map(|c| c.hex),
        color,
        price: variant.price(),
        external_id: variant.external_id.clone(),
    }
}

/// Color and size of a store variant.
///
/// The catalog's own fields win; the store variant name
/// (`"Product / Color / Size"`) fills the gaps.
fn variant_attributes(variant: &SyncVariant, catalog: &CatalogVariant) -> (String, Size) {
    let (name_color, name_size) = split_variant_name(&variant.name);

    let color = catalog
        .color
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or(name_color)
        .unwrap_or(DEFAULT_COLOR)
        .to_string();

    let size = catalog
        .size
        .as_deref()
        .and_then(|s| s.parse::<Size>().ok())
        .or_else(|| name_size.and_then(|s| s.parse::<Size>().ok()))
        .unwrap_or(Size::OneSize);

    (color, size)
}

/// Split `"Product / Color / Size"` into its color and size parts.
fn split_variant_name(name: &str) -> (Option<&str>, Option<&str>) {
    let parts: Vec<&str> = name.split(" / ").map(str::trim).collect();
    match parts.as_slice() {
        [.., color, size] if parts.len() >= 3 => (Some(*color), Some(*size)),
        [_, last] if last.parse::<Size>().is_ok() => (None, Some(*last)),
        [_, last] => (Some(*last), None),
        _ => (None, None),
    }
}

/// Which print design a store variant carries.
///
/// An explicit `dark`/`light` in the variant's name or external id wins,
/// then the palette's design for the color, then dark.
fn infer_design(
    variant: &SyncVariant,
    product_type: ProductType,
    color: &str,
    palette: &ColorPalette,
) -> Design {
    let words: HashSet<String> = [variant.name.as_str(), variant.external_id.as_deref().unwrap_or("")]
        .iter()
        .flat_map(|s| s.split(|c: char| !c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .collect();

    if words.contains("light") {
        return Design::Light;
    }
    if words.contains("dark") {
        return Design::Dark;
    }

    palette
        .get(product_type, color)
        .and_then(|c| c.design)
        .unwrap_or(Design::Dark)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reform_shop_core::{CatalogVariantId, SyncVariantId};

    fn sync_variant(name: &str, external_id: Option<&str>) -> SyncVariant {
        serde_json::from_value(serde_json::json!({
            "id": 4_001_234,
            "variant_id": 5530,
            "name": name,
            "external_id": external_id,
        }))
        .unwrap()
    }

    fn catalog(color: Option<&str>, size: Option<&str>) -> CatalogVariant {
        CatalogVariant {
            id: CatalogVariantId::new(5530),
            product_id: 380,
            name: String::new(),
            size: size.map(String::from),
            color: color.map(String::from),
            color_code: Some("#0B0B0B".to_string()),
            in_stock: true,
        }
    }

    #[test]
    fn splits_three_part_names() {
        assert_eq!(
            split_variant_name("Reform Hoodie / Navy / XL"),
            (Some("Navy"), Some("XL"))
        );
        assert_eq!(split_variant_name("Reform Mug / 11oz"), (Some("11oz"), None));
        assert_eq!(split_variant_name("Reform Cap / One size"), (None, Some("One size")));
        assert_eq!(split_variant_name("Reform Tote"), (None, None));
    }

    #[test]
    fn catalog_fields_win_over_name() {
        let variant = sync_variant("Reform Hoodie / Navy / XL", None);
        let (color, size) = variant_attributes(&variant, &catalog(Some("Black"), Some("S")));
        assert_eq!(color, "Black");
        assert_eq!(size, Size::S);

        let (color, size) = variant_attributes(&variant, &catalog(None, None));
        assert_eq!(color, "Navy");
        assert_eq!(size, Size::XL);
    }

    #[test]
    fn design_from_external_id_then_palette() {
        let palette = ColorPalette::builtin();

        let light = sync_variant("Reform Tee / White / M", Some("tee-light-white-m"));
        assert_eq!(
            infer_design(&light, ProductType::Tshirt, "White", &palette),
            Design::Light
        );

        let plain = sync_variant("Reform Tee / Unlisted / M", None);
        assert_eq!(
            infer_design(&plain, ProductType::Tshirt, "Unlisted", &palette),
            Design::Dark
        );
    }

    #[test]
    fn exported_rows_keep_store_sync_id() {
        let palette = ColorPalette::builtin();
        let mut variant = sync_variant("Reform Hoodie / Black / M", Some("hoodie-dark-black-m"));
        variant.retail_price = Some("39.99".to_string());

        let row = exported_variant(
            &variant,
            &catalog(Some("Black"), Some("M")),
            ProductType::Hoodie,
            &palette,
        );

        assert_eq!(row.key, "DARK-Black-M");
        assert_eq!(row.sync_variant_id, SyncVariantId::new(4_001_234));
        assert_eq!(row.catalog_variant_id, CatalogVariantId::new(5530));
        assert!(row.color_hex.is_some());
        assert_eq!(row.price.map(|p| p.to_string()).as_deref(), Some("39.99"));
    }

    mod export_from_printful {
        use std::time::Duration;

        use axum::extract::Path as UrlPath;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::{Value, json};

        use super::*;

        async fn product(UrlPath(id): UrlPath<i64>) -> Result<Json<Value>, StatusCode> {
            match id {
                301 => Ok(Json(json!({
                    "code": 200,
                    "result": {
                        "sync_product": { "id": 301, "name": "Reform Hoodie" },
                        "sync_variants": [
                            { "id": 4_001_001, "variant_id": 5530, "name": "Reform Hoodie / Black / S" },
                            { "id": 4_001_002, "variant_id": 5531, "name": "Reform Hoodie / Black / M" }
                        ]
                    }
                }))),
                _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
            }
        }

        async fn catalog_variant(UrlPath(id): UrlPath<i64>) -> Result<Json<Value>, StatusCode> {
            match id {
                5530 => Ok(Json(json!({
                    "code": 200,
                    "result": {
                        "variant": {
                            "id": 5530, "product_id": 380, "size": "S",
                            "color": "Black", "color_code": "#0b0b0b", "in_stock": true
                        }
                    }
                }))),
                _ => Err(StatusCode::NOT_FOUND),
            }
        }

        async fn printful_stub() -> PrintfulClient {
            let app = Router::new()
                .route(
                    "/store/products",
                    get(|| async {
                        Json(json!({
                            "code": 200,
                            "result": [
                                { "id": 301, "name": "Reform Hoodie" },
                                { "id": 302, "name": "Reform Mug" }
                            ],
                            "paging": { "total": 2, "offset": 0, "limit": 100 }
                        }))
                    }),
                )
                .route("/store/products/{id}", get(product))
                .route("/products/variant/{id}", get(catalog_variant));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let config = PrintfulConfig {
                token: secrecy::SecretString::from("pf-test-token"),
                store_id: None,
            };
            PrintfulClient::with_base_url(&config, &format!("http://{addr}"), Duration::ZERO)
                .unwrap()
        }

        #[tokio::test]
        async fn failures_are_skipped_and_remaining_tables_written() {
            let client = printful_stub().await;
            let dir = tempfile::tempdir().unwrap();

            let err = export_tables(&client, dir.path(), &ColorPalette::builtin())
                .await
                .unwrap_err();

            assert!(matches!(err, CommandError::Failed(ref msg) if msg.starts_with("2 ")));

            let hoodies = VariantTable::from_json(
                &std::fs::read_to_string(dir.path().join("hoodie-variants.json")).unwrap(),
            )
            .unwrap();
            assert_eq!(hoodies.len(), 1);
            assert!(!dir.path().join("mug-variants.json").exists());
        }
    }
}
