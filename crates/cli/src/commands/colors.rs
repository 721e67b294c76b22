//! Color maintenance command.
//!
//! ```bash
//! rs-cli colors fix --dry-run
//! rs-cli colors fix --palette data/palette.json
//! ```
//!
//! Recomputes every variant's `color_hex` from the palette entry for its
//! product type and color name. The same color name can be a different
//! shade on different blanks, so the product type is part of the key.

use reform_shop_core::ColorPalette;
use reform_shop_core::colors::normalize_hex;
use reform_shop_functions::db::catalog::{CatalogRepository, CatalogVariant};

use super::{CommandError, connect};

/// What the fixer decided for one variant.
#[derive(Debug, PartialEq, Eq)]
enum ColorFix {
    Unchanged,
    Update(String),
    Unknown,
}

fn plan_fix(variant: &CatalogVariant, palette: &ColorPalette) -> ColorFix {
    let Some(entry) = palette.get(variant.product_type, &variant.color) else {
        return ColorFix::Unknown;
    };

    let current = variant.color_hex.as_deref().and_then(normalize_hex);
    if current.as_deref() == Some(entry.hex.as_str()) {
        ColorFix::Unchanged
    } else {
        ColorFix::Update(entry.hex.clone())
    }
}

/// Rewrite stored color hex values from the palette.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an update fails.
pub async fn fix(dry_run: bool, palette: &ColorPalette) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = CatalogRepository::new(&pool);

    let variants = repo.all_variants().await?;
    let (mut updated, mut unchanged, mut unknown) = (0usize, 0usize, 0usize);

    for variant in &variants {
        match plan_fix(variant, palette) {
            ColorFix::Unchanged => unchanged += 1,
            ColorFix::Unknown => {
                unknown += 1;
                tracing::warn!(
                    product_type = %variant.product_type,
                    color = %variant.color,
                    catalog_variant_id = %variant.catalog_variant_id,
                    "Color not in palette"
                );
            }
            ColorFix::Update(hex) => {
                tracing::info!(
                    product_type = %variant.product_type,
                    color = %variant.color,
                    size = %variant.size,
                    from = variant.color_hex.as_deref().unwrap_or("-"),
                    to = %hex,
                    "Color hex changed"
                );
                if !dry_run {
                    repo.update_color_hex(variant.id, &hex).await?;
                }
                updated += 1;
            }
        }
    }

    tracing::info!(
        total = variants.len(),
        updated,
        unchanged,
        unknown,
        dry_run,
        "Color fix complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reform_shop_core::{CatalogVariantId, ProductId, ProductType, VariantId};

    fn variant(product_type: ProductType, color: &str, hex: Option<&str>) -> CatalogVariant {
        CatalogVariant {
            id: VariantId::new_v4(),
            product_id: ProductId::new_v4(),
            product_type,
            catalog_variant_id: CatalogVariantId::new(1),
            color: color.to_string(),
            color_hex: hex.map(String::from),
            size: "M".to_string(),
        }
    }

    #[test]
    fn same_name_resolves_per_product_type() {
        let palette = ColorPalette::builtin();
        let cap_black = palette.get(ProductType::Cap, "Black").unwrap().hex.clone();

        assert_eq!(
            plan_fix(&variant(ProductType::Cap, "Black", None), &palette),
            ColorFix::Update(cap_black.clone())
        );
        assert_eq!(
            plan_fix(
                &variant(ProductType::Cap, "black", Some(&cap_black.to_uppercase())),
                &palette
            ),
            ColorFix::Unchanged
        );
    }

    #[test]
    fn unknown_colors_are_left_alone() {
        let palette = ColorPalette::builtin();
        assert_eq!(
            plan_fix(&variant(ProductType::Cap, "Plaid", Some("#123456")), &palette),
            ColorFix::Unknown
        );
    }
}
