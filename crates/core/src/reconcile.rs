//! Variant reconciliation.
//!
//! Maps (design, color, size) combinations to Printful catalog variant ids.
//! Printful's catalog tables don't name colors, only positions ("the third
//! color offered in size M for this blank"), so each combination is given a
//! color slot and looked up as `"{DESIGN}-Color{slot}-{SIZE}"`.
//!
//! Walk order is fixed: designs in [`Design::ALL`] order, then sizes in
//! [`Size::STANDARD`] order (any other sizes after, in first-seen order),
//! then combinations in input order. The n-th combination of a given design
//! in a size gets slot n. Synthetic ids use [`Size::catalog_index`], so a
//! combination's id does not depend on which other sizes are present.
//!
//! Reconciliation is all-or-nothing. A repeated combination or two rows
//! landing on the same catalog id is an error, and no rows are returned.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Design, Size};
use crate::types::{CatalogVariantId, SyncVariantId};

/// One sellable combination to be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCombination {
    /// Stable name for the combination; defaults to `DESIGN-Color-SIZE`.
    #[serde(default)]
    pub key: Option<String>,
    pub design: Design,
    pub color: String,
    pub size: Size,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl VariantCombination {
    #[must_use]
    pub fn new(design: Design, color: impl Into<String>, size: Size) -> Self {
        Self {
            key: None,
            design,
            color: color.into(),
            size,
            color_hex: None,
            external_id: None,
            price: None,
        }
    }

    /// The combination's key, derived when not given.
    #[must_use]
    pub fn key(&self) -> String {
        self.key.clone().unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                self.design,
                self.color.replace(' ', ""),
                self.size
            )
        })
    }

    fn triple(&self) -> (Design, Size, String) {
        (self.design, self.size, self.color.trim().to_lowercase())
    }
}

/// Lookup table keyed `"{DESIGN}-Color{slot}-{SIZE}"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogTable(HashMap<String, CatalogVariantId>);

impl CatalogTable {
    /// Table key for a design, 1-based color slot, and size.
    #[must_use]
    pub fn slot_key(design: Design, slot: usize, size: Size) -> String {
        format!("{design}-Color{slot}-{size}")
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CatalogVariantId> {
        self.0.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, id: CatalogVariantId) {
        self.0.insert(key.into(), id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for CatalogTable {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), CatalogVariantId::new(v)))
                .collect(),
        )
    }
}

/// Base and stride for one design in the synthetic id scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRange {
    pub base: i64,
    pub stride: i64,
}

/// Deterministic placeholder ids: `base + size_index * stride + color_index`.
///
/// Used when no catalog table is available yet. Strides must be at least the
/// number of colors per size or ids will overlap, which reconciliation
/// reports as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticScheme {
    pub dark: SyntheticRange,
    pub light: SyntheticRange,
}

impl Default for SyntheticScheme {
    fn default() -> Self {
        Self {
            dark: SyntheticRange {
                base: 10_000,
                stride: 12,
            },
            light: SyntheticRange {
                base: 20_000,
                stride: 8,
            },
        }
    }
}

impl SyntheticScheme {
    /// Id for zero-based size and color indices.
    #[must_use]
    pub fn id_for(&self, design: Design, size_index: usize, color_index: usize) -> CatalogVariantId {
        let range = match design {
            Design::Dark => self.dark,
            Design::Light => self.light,
        };
        let size_index = i64::try_from(size_index).unwrap_or(i64::MAX);
        let color_index = i64::try_from(color_index).unwrap_or(i64::MAX);
        CatalogVariantId::new(
            range
                .base
                .saturating_add(size_index.saturating_mul(range.stride))
                .saturating_add(color_index),
        )
    }
}

/// Where catalog ids come from.
#[derive(Debug, Clone, Copy)]
pub enum IdSource<'a> {
    Table(&'a CatalogTable),
    Synthetic(SyntheticScheme),
}

/// A combination with its catalog id assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledVariant {
    pub key: String,
    pub catalog_variant_id: CatalogVariantId,
    /// Store sync id in exported tables; reconciliation mirrors the catalog id here.
    pub sync_variant_id: SyncVariantId,
    pub design: Design,
    pub size: Size,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub sku: String,
}

/// A combination the id source had no entry for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedCombination {
    pub key: String,
    pub lookup_key: String,
}

/// Reconciliation output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub variants: Vec<ReconciledVariant>,
    pub unmapped: Vec<UnmappedCombination>,
}

/// Fatal reconciliation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("combination {design} {color} {size} appears more than once")]
    DuplicateCombination {
        design: Design,
        size: Size,
        color: String,
    },
    #[error("catalog variant id {id} assigned to both {first} and {second}")]
    DuplicateCatalogId {
        id: CatalogVariantId,
        first: String,
        second: String,
    },
}

/// Sizes in walk order: standard sizes first, then others as first seen.
fn size_order(combinations: &[VariantCombination]) -> Vec<Size> {
    let mut present: Vec<Size> = Size::STANDARD
        .iter()
        .copied()
        .filter(|s| combinations.iter().any(|c| c.size == *s))
        .collect();
    for combination in combinations {
        if !present.contains(&combination.size) {
            present.push(combination.size);
        }
    }
    present
}

/// Assign catalog ids to every combination.
///
/// # Errors
///
/// Returns [`ReconcileError::DuplicateCombination`] when the same
/// (design, size, color) appears twice in the input, and
/// [`ReconcileError::DuplicateCatalogId`] when two combinations resolve to
/// the same catalog id.
pub fn reconcile(
    combinations: &[VariantCombination],
    source: IdSource<'_>,
) -> Result<Reconciliation, ReconcileError> {
    let mut seen = HashSet::with_capacity(combinations.len());
    for combination in combinations {
        if !seen.insert(combination.triple()) {
            return Err(ReconcileError::DuplicateCombination {
                design: combination.design,
                size: combination.size,
                color: combination.color.clone(),
            });
        }
    }

    let mut result = Reconciliation::default();
    let mut assigned: HashMap<CatalogVariantId, String> = HashMap::new();

    let sizes = size_order(combinations);

    for (design, size) in Design::ALL
        .into_iter()
        .flat_map(|d| sizes.iter().map(move |s| (d, *s)))
    {
        let group = combinations
            .iter()
            .filter(|c| c.design == design && c.size == size);

        for (slot, combination) in (1..).zip(group) {
            let lookup_key = CatalogTable::slot_key(design, slot, size);
            let key = combination.key();

            let id = match source {
                IdSource::Table(table) => table.get(&lookup_key),
                IdSource::Synthetic(scheme) => {
                    Some(scheme.id_for(design, size.catalog_index(), slot - 1))
                }
            };

            let Some(id) = id else {
                result.unmapped.push(UnmappedCombination { key, lookup_key });
                continue;
            };

            if let Some(first) = assigned.get(&id) {
                return Err(ReconcileError::DuplicateCatalogId {
                    id,
                    first: first.clone(),
                    second: key,
                });
            }
            assigned.insert(id, key.clone());

            result.variants.push(ReconciledVariant {
                sku: key.clone(),
                key,
                catalog_variant_id: id,
                sync_variant_id: SyncVariantId::new(id.as_i64()),
                design,
                size,
                color: combination.color.clone(),
                color_hex: combination.color_hex.clone(),
                price: combination.price,
                external_id: combination.external_id.clone(),
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, i64)]) -> CatalogTable {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn maps_combinations_through_the_table() {
        let combos = vec![
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Dark, "Black", Size::M),
        ];
        let table = table(&[("DARK-Color1-S", 100), ("DARK-Color1-M", 101)]);

        let out = reconcile(&combos, IdSource::Table(&table)).unwrap();

        let ids: Vec<i64> = out
            .variants
            .iter()
            .map(|v| v.catalog_variant_id.as_i64())
            .collect();
        assert_eq!(ids, vec![100, 101]);
        assert!(out.unmapped.is_empty());
    }

    #[test]
    fn colliding_ids_fail_without_output() {
        let combos = vec![
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Dark, "Black", Size::M),
            VariantCombination::new(Design::Light, "White", Size::S),
        ];
        let table = table(&[
            ("DARK-Color1-S", 100),
            ("DARK-Color1-M", 101),
            ("LIGHT-Color1-S", 100),
        ]);

        let err = reconcile(&combos, IdSource::Table(&table)).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::DuplicateCatalogId { id, .. } if id.as_i64() == 100
        ));
    }

    #[test]
    fn colors_take_slots_in_input_order_within_each_size() {
        let combos = vec![
            VariantCombination::new(Design::Dark, "Black", Size::M),
            VariantCombination::new(Design::Dark, "Navy", Size::M),
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Dark, "Navy", Size::S),
        ];
        let table = table(&[
            ("DARK-Color1-S", 5530),
            ("DARK-Color2-S", 5531),
            ("DARK-Color1-M", 5594),
            ("DARK-Color2-M", 5595),
        ]);

        let out = reconcile(&combos, IdSource::Table(&table)).unwrap();

        let rows: Vec<(Size, &str, i64)> = out
            .variants
            .iter()
            .map(|v| (v.size, v.color.as_str(), v.catalog_variant_id.as_i64()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (Size::S, "Black", 5530),
                (Size::S, "Navy", 5531),
                (Size::M, "Black", 5594),
                (Size::M, "Navy", 5595),
            ]
        );
    }

    #[test]
    fn unmapped_combinations_are_reported_not_emitted() {
        let combos = vec![
            VariantCombination::new(Design::Light, "White", Size::S),
            VariantCombination::new(Design::Light, "White", Size::XXL),
        ];
        let table = table(&[("LIGHT-Color1-S", 5610)]);

        let out = reconcile(&combos, IdSource::Table(&table)).unwrap();

        assert_eq!(out.variants.len(), 1);
        assert_eq!(out.unmapped.len(), 1);
        assert_eq!(out.unmapped[0].lookup_key, "LIGHT-Color1-2XL");
    }

    #[test]
    fn repeated_combination_is_rejected() {
        let combos = vec![
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Dark, "black ", Size::S),
        ];
        let err = reconcile(&combos, IdSource::Synthetic(SyntheticScheme::default()))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateCombination { .. }));
    }

    #[test]
    fn synthetic_scheme_uses_design_bases() {
        let combos = vec![
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Dark, "Navy", Size::S),
            VariantCombination::new(Design::Dark, "Black", Size::M),
            VariantCombination::new(Design::Light, "White", Size::M),
        ];

        let out = reconcile(&combos, IdSource::Synthetic(SyntheticScheme::default())).unwrap();

        let ids: Vec<i64> = out
            .variants
            .iter()
            .map(|v| v.catalog_variant_id.as_i64())
            .collect();
        assert_eq!(ids, vec![10_000, 10_001, 10_012, 20_008]);
    }

    #[test]
    fn synthetic_id_ignores_which_other_sizes_are_present() {
        let scheme = IdSource::Synthetic(SyntheticScheme::default());
        let with_small = reconcile(
            &[
                VariantCombination::new(Design::Dark, "Black", Size::S),
                VariantCombination::new(Design::Dark, "Black", Size::M),
            ],
            scheme,
        )
        .unwrap();
        let medium_only = reconcile(
            &[VariantCombination::new(Design::Dark, "Black", Size::M)],
            scheme,
        )
        .unwrap();

        assert_eq!(
            with_small.variants[1].catalog_variant_id,
            medium_only.variants[0].catalog_variant_id
        );
        assert_eq!(medium_only.variants[0].catalog_variant_id.as_i64(), 10_012);
    }

    #[test]
    fn extended_sizes_get_ids_after_standard_ones() {
        let out = reconcile(
            &[VariantCombination::new(Design::Light, "White", Size::XXXL)],
            IdSource::Synthetic(SyntheticScheme::default()),
        )
        .unwrap();
        assert_eq!(out.variants[0].catalog_variant_id.as_i64(), 20_000 + 5 * 8);
    }

    #[test]
    fn dark_rows_come_before_light_rows() {
        let combos = vec![
            VariantCombination::new(Design::Light, "White", Size::S),
            VariantCombination::new(Design::Dark, "Black", Size::S),
            VariantCombination::new(Design::Light, "White", Size::M),
            VariantCombination::new(Design::Dark, "Black", Size::M),
        ];

        let out = reconcile(&combos, IdSource::Synthetic(SyntheticScheme::default())).unwrap();

        let order: Vec<(Design, Size)> = out.variants.iter().map(|v| (v.design, v.size)).collect();
        assert_eq!(
            order,
            vec![
                (Design::Dark, Size::S),
                (Design::Dark, Size::M),
                (Design::Light, Size::S),
                (Design::Light, Size::M),
            ]
        );
    }

    #[test]
    fn every_mapped_triple_appears_exactly_once() {
        let colors = ["Black", "Navy", "Red"];
        let mut combos = Vec::new();
        for size in Size::STANDARD {
            for color in colors {
                combos.push(VariantCombination::new(Design::Dark, color, size));
            }
        }

        let out = reconcile(&combos, IdSource::Synthetic(SyntheticScheme::default())).unwrap();

        assert_eq!(out.variants.len(), combos.len());
        let ids: HashSet<_> = out.variants.iter().map(|v| v.catalog_variant_id).collect();
        assert_eq!(ids.len(), combos.len());
        for combo in &combos {
            let hits = out
                .variants
                .iter()
                .filter(|v| v.size == combo.size && v.color == combo.color)
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn sync_id_mirrors_catalog_id_and_sku_is_key() {
        let mut combo = VariantCombination::new(Design::Dark, "Steel Blue", Size::XL);
        combo.price = Some(Decimal::new(2500, 2));
        let out = reconcile(&[combo], IdSource::Synthetic(SyntheticScheme::default())).unwrap();
        let row = &out.variants[0];
        assert_eq!(row.sync_variant_id.as_i64(), row.catalog_variant_id.as_i64());
        assert_eq!(row.sku, "DARK-SteelBlue-XL");
        assert_eq!(row.price, Some(Decimal::new(2500, 2)));
    }
}
