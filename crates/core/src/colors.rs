//! Canonical garment colors.
//!
//! The same color name is a different shade on different blanks ("Black" on
//! a cap is `#181717`, on a t-shirt `#0c0c0c`), so a color is only meaningful
//! together with the product type it belongs to. [`ColorPalette`] is keyed by
//! `(ProductType, name)` and is the single place hex values are decided.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Design, ProductType};

/// One palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub product_type: ProductType,
    /// Which print design this blank color is offered with, if restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<Design>,
    pub name: String,
    pub hex: String,
}

/// How a hex value was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    /// Found in the palette.
    Palette,
    /// Not in the palette; the fulfillment provider's own code was used.
    Provider,
}

/// A resolved color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColor {
    pub hex: String,
    pub source: ColorSource,
}

/// Palette construction failures.
#[derive(thiserror::Error, Debug)]
pub enum PaletteError {
    #[error("invalid hex value {hex:?} for {product_type} {name}")]
    InvalidHex {
        product_type: ProductType,
        name: String,
        hex: String,
    },
    #[error("{product_type} {name} is listed more than once")]
    Duplicate {
        product_type: ProductType,
        name: String,
    },
    #[error("invalid palette JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Color lookup keyed by product type and color name.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    entries: Vec<PaletteColor>,
    index: HashMap<(ProductType, String), usize>,
}

const BUILTIN: &[(ProductType, Option<Design>, &str, &str)] = &[
    (ProductType::Cap, None, "Black", "#181717"),
    (ProductType::Cap, None, "Dark Grey", "#39353a"),
    (ProductType::Cap, None, "Khaki", "#b49771"),
    (ProductType::Cap, None, "Light Blue", "#b5cbda"),
    (ProductType::Cap, None, "Navy", "#182031"),
    (ProductType::Cap, None, "Pink", "#fab2ba"),
    (ProductType::Cap, None, "Stone", "#d6bdad"),
    (ProductType::Cap, None, "White", "#ffffff"),
    (ProductType::Tshirt, Some(Design::Dark), "Army", "#5f5849"),
    (ProductType::Tshirt, Some(Design::Dark), "Asphalt", "#52514f"),
    (ProductType::Tshirt, Some(Design::Dark), "Autumn", "#c85313"),
    (ProductType::Tshirt, Some(Design::Dark), "Black", "#0c0c0c"),
    (ProductType::Tshirt, Some(Design::Dark), "Black Heather", "#0b0b0b"),
    (ProductType::Tshirt, Some(Design::Dark), "Dark Grey Heather", "#3e3c3d"),
    (ProductType::Tshirt, Some(Design::Dark), "Heather Deep Teal", "#447085"),
    (ProductType::Tshirt, Some(Design::Dark), "Mauve", "#bf6e6e"),
    (ProductType::Tshirt, Some(Design::Dark), "Navy", "#212642"),
    (ProductType::Tshirt, Some(Design::Dark), "Olive", "#5b642f"),
    (ProductType::Tshirt, Some(Design::Dark), "Red", "#d0071e"),
    (ProductType::Tshirt, Some(Design::Dark), "Steel Blue", "#668ea7"),
    (ProductType::Tshirt, Some(Design::Light), "Ash", "#f0f1ea"),
    (ProductType::Tshirt, Some(Design::Light), "Athletic Heather", "#cececc"),
    (ProductType::Tshirt, Some(Design::Light), "Heather Dust", "#e5d9c9"),
    (ProductType::Tshirt, Some(Design::Light), "Heather Prism Peach", "#f3c2b2"),
    (ProductType::Tshirt, Some(Design::Light), "Mustard", "#eda027"),
    (ProductType::Tshirt, Some(Design::Light), "Pink", "#fdbfc7"),
    (ProductType::Tshirt, Some(Design::Light), "White", "#ffffff"),
    (ProductType::Tshirt, Some(Design::Light), "Yellow", "#ffd667"),
    (ProductType::Hoodie, Some(Design::Dark), "Black", "#0b0b0b"),
    (ProductType::Hoodie, Some(Design::Dark), "Dark Heather", "#47484d"),
    (ProductType::Hoodie, Some(Design::Dark), "Indigo Blue", "#395d82"),
    (ProductType::Hoodie, Some(Design::Dark), "Navy", "#131928"),
    (ProductType::Hoodie, Some(Design::Dark), "Red", "#da0a1a"),
    (ProductType::Hoodie, Some(Design::Light), "Light Blue", "#a1c5e1"),
    (ProductType::Hoodie, Some(Design::Light), "Light Pink", "#f3d4e3"),
    (ProductType::Hoodie, Some(Design::Light), "Sport Grey", "#9b969c"),
    (ProductType::Hoodie, Some(Design::Light), "White", "#ffffff"),
];

fn key(product_type: ProductType, name: &str) -> (ProductType, String) {
    (product_type, name.trim().to_lowercase())
}

/// Normalize `#RGB`, `RRGGBB` or `#RRGGBB` to lowercase `#rrggbb`.
#[must_use]
pub fn normalize_hex(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_owned(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_lowercase()))
}

impl ColorPalette {
    /// Build a palette, validating hex values and rejecting duplicate keys.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError`] on a malformed hex value or a repeated
    /// `(product_type, name)` pair.
    pub fn new(entries: Vec<PaletteColor>) -> Result<Self, PaletteError> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut normalized = Vec::with_capacity(entries.len());

        for mut entry in entries {
            let Some(hex) = normalize_hex(&entry.hex) else {
                return Err(PaletteError::InvalidHex {
                    product_type: entry.product_type,
                    name: entry.name,
                    hex: entry.hex,
                });
            };
            entry.hex = hex;

            let k = key(entry.product_type, &entry.name);
            if index.insert(k, normalized.len()).is_some() {
                return Err(PaletteError::Duplicate {
                    product_type: entry.product_type,
                    name: entry.name,
                });
            }
            normalized.push(entry);
        }

        Ok(Self {
            entries: normalized,
            index,
        })
    }

    /// The palette the shop ships with.
    #[must_use]
    pub fn builtin() -> Self {
        let entries: Vec<PaletteColor> = BUILTIN
            .iter()
            .map(|(product_type, design, name, hex)| PaletteColor {
                product_type: *product_type,
                design: *design,
                name: (*name).to_owned(),
                hex: (*hex).to_owned(),
            })
            .collect();
        // Table is already normalized; `builtin_palette_is_valid` checks it.
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (key(e.product_type, &e.name), i))
            .collect();
        Self { entries, index }
    }

    /// Load a palette from a JSON array of [`PaletteColor`].
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError`] if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, PaletteError> {
        let entries: Vec<PaletteColor> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Look up an entry by product type and (case-insensitive) name.
    #[must_use]
    pub fn get(&self, product_type: ProductType, name: &str) -> Option<&PaletteColor> {
        self.index
            .get(&key(product_type, name))
            .and_then(|i| self.entries.get(*i))
    }

    /// Resolve a color's hex value.
    ///
    /// The palette wins; otherwise the provider's color code is used if it is
    /// a valid hex value. `None` means the color is unknown everywhere.
    #[must_use]
    pub fn resolve(
        &self,
        product_type: ProductType,
        name: &str,
        provider_code: Option<&str>,
    ) -> Option<ResolvedColor> {
        if let Some(entry) = self.get(product_type, name) {
            return Some(ResolvedColor {
                hex: entry.hex.clone(),
                source: ColorSource::Palette,
            });
        }
        provider_code.and_then(normalize_hex).map(|hex| ResolvedColor {
            hex,
            source: ColorSource::Provider,
        })
    }

    /// Colors offered for a product type, optionally narrowed to one design.
    pub fn colors_for(
        &self,
        product_type: ProductType,
        design: Option<Design>,
    ) -> impl Iterator<Item = &PaletteColor> {
        self.entries.iter().filter(move |e| {
            e.product_type == product_type && (design.is_none() || e.design == design)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_palette_is_valid() {
        let entries = BUILTIN
            .iter()
            .map(|(product_type, design, name, hex)| PaletteColor {
                product_type: *product_type,
                design: *design,
                name: (*name).to_owned(),
                hex: (*hex).to_owned(),
            })
            .collect();
        let validated = ColorPalette::new(entries).unwrap();
        let builtin = ColorPalette::builtin();
        assert_eq!(validated.len(), BUILTIN.len());
        assert_eq!(builtin.len(), BUILTIN.len());
        for entry in &builtin.entries {
            assert_eq!(
                validated.get(entry.product_type, &entry.name).unwrap().hex,
                entry.hex
            );
        }
    }

    #[test]
    fn same_name_differs_by_product_type() {
        let palette = ColorPalette::builtin();
        let cap = palette.get(ProductType::Cap, "Black").unwrap();
        let tee = palette.get(ProductType::Tshirt, "Black").unwrap();
        let hoodie = palette.get(ProductType::Hoodie, "black").unwrap();
        assert_eq!(cap.hex, "#181717");
        assert_eq!(tee.hex, "#0c0c0c");
        assert_eq!(hoodie.hex, "#0b0b0b");
    }

    #[test]
    fn hex_is_normalized_to_lowercase() {
        let palette = ColorPalette::builtin();
        let grey = palette.get(ProductType::Tshirt, "Dark Grey Heather").unwrap();
        assert_eq!(grey.hex, "#3e3c3d");
        assert_eq!(normalize_hex("FFF").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_hex("#12345"), None);
        assert_eq!(normalize_hex("#zzzzzz"), None);
    }

    #[test]
    fn resolve_falls_back_to_provider_code() {
        let palette = ColorPalette::builtin();
        let resolved = palette
            .resolve(ProductType::Mug, "Black", Some("#000000"))
            .unwrap();
        assert_eq!(resolved.source, ColorSource::Provider);
        assert_eq!(resolved.hex, "#000000");

        let resolved = palette
            .resolve(ProductType::Cap, "Navy", Some("#000000"))
            .unwrap();
        assert_eq!(resolved.source, ColorSource::Palette);
        assert_eq!(resolved.hex, "#182031");

        assert!(palette.resolve(ProductType::Mug, "Teal", None).is_none());
    }

    #[test]
    fn duplicates_are_rejected() {
        let json = r##"[
            {"product_type": "cap", "name": "Black", "hex": "#000000"},
            {"product_type": "cap", "name": "black", "hex": "#111111"}
        ]"##;
        assert!(matches!(
            ColorPalette::from_json(json),
            Err(PaletteError::Duplicate { .. })
        ));
    }

    #[test]
    fn colors_for_filters_by_design() {
        let palette = ColorPalette::builtin();
        assert_eq!(
            palette
                .colors_for(ProductType::Hoodie, Some(Design::Dark))
                .count(),
            5
        );
        assert_eq!(palette.colors_for(ProductType::Hoodie, None).count(), 9);
    }
}
