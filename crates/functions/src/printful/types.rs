//! Printful v1 response types.
//!
//! Printful wraps every payload as `{"code": 200, "result": ...}`; list
//! endpoints add a `paging` object.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use reform_shop_core::{CatalogVariantId, PrintfulProductId, SyncVariantId};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Paging {
    pub total: u32,
    pub offset: u32,
    pub limit: u32,
}

/// A product in the Printful store (summary listing).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProduct {
    pub id: PrintfulProductId,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub variants: u32,
    #[serde(default)]
    pub synced: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

/// A sync product together with its variants.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProduct,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

/// A store variant.
///
/// `id` is the store-specific sync id; `variant_id` is the catalog variant
/// id that order placement needs.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: SyncVariantId,
    #[serde(rename = "variant_id")]
    pub catalog_variant_id: CatalogVariantId,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Decimal string such as `"24.99"`.
    #[serde(default)]
    pub retail_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub is_ignored: bool,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub files: Vec<SyncVariantFile>,
}

impl SyncVariant {
    /// Mockup image for this variant, if Printful rendered one.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.file_type == "preview")
            .and_then(|f| f.preview_url.as_deref())
    }

    /// Retail price as a decimal amount in major units.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        Decimal::from_str(self.retail_price.as_deref()?.trim()).ok()
    }

    /// Retail price in minor units, rounded half away from zero.
    #[must_use]
    pub fn retail_price_pence(&self) -> Option<i64> {
        (self.price()? * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariantFile {
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogVariantResult {
    pub variant: CatalogVariant,
}

/// A variant of the Printful catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVariant {
    pub id: CatalogVariantId,
    pub product_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn sync_variant_keeps_both_ids() {
        let detail: Envelope<SyncProductDetail> = serde_json::from_value(serde_json::json!({
            "code": 200,
            "result": {
                "sync_product": { "id": 301, "name": "Reform Hoodie", "external_id": "hoodie-main" },
                "sync_variants": [{
                    "id": 4_001_234,
                    "variant_id": 5530,
                    "name": "Reform Hoodie / Black / S",
                    "retail_price": "39.99",
                    "files": [
                        { "type": "default", "preview_url": "https://files/default.png" },
                        { "type": "preview", "preview_url": "https://files/mockup.png" }
                    ]
                }]
            }
        }))
        .unwrap();

        let variant = &detail.result.sync_variants[0];
        assert_eq!(variant.id, SyncVariantId::new(4_001_234));
        assert_eq!(variant.catalog_variant_id, CatalogVariantId::new(5530));
        assert_eq!(variant.preview_url(), Some("https://files/mockup.png"));
        assert_eq!(variant.retail_price_pence(), Some(3999));
    }

    #[test]
    fn catalog_variant_parses_color_code() {
        let result: Envelope<CatalogVariantResult> = serde_json::from_value(serde_json::json!({
            "code": 200,
            "result": {
                "variant": {
                    "id": 5530, "product_id": 380, "name": "Hoodie (Black / S)",
                    "size": "S", "color": "Black", "color_code": "#0b0b0b", "in_stock": true
                },
                "product": { "id": 380 }
            }
        }))
        .unwrap();

        assert_eq!(result.result.variant.color.as_deref(), Some("Black"));
        assert!(result.result.variant.in_stock);
    }
}
