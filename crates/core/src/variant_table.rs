//! Read-only index over a reconciled variant table.
//!
//! Tables are stored as JSON arrays of [`ReconciledVariant`] and loaded
//! through [`VariantTable::from_json`]. Construction enforces the two table
//! invariants: catalog ids are pairwise distinct, and each
//! (design, size, color) appears once.

use std::collections::HashMap;

use crate::catalog::{Design, Size};
use crate::reconcile::ReconciledVariant;
use crate::types::CatalogVariantId;

/// Table validation failures.
#[derive(thiserror::Error, Debug)]
pub enum VariantTableError {
    #[error("catalog variant id {0} appears more than once")]
    DuplicateCatalogId(CatalogVariantId),
    #[error("{design} {color} {size} appears more than once")]
    DuplicateCombination {
        design: Design,
        size: Size,
        color: String,
    },
    #[error("invalid variant table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

type Triple = (Design, Size, String);

fn triple(design: Design, size: Size, color: &str) -> Triple {
    (design, size, color.trim().to_lowercase())
}

/// Indexed variant table.
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    variants: Vec<ReconciledVariant>,
    by_catalog: HashMap<CatalogVariantId, usize>,
    by_triple: HashMap<Triple, usize>,
}

impl VariantTable {
    /// Index a list of variants.
    ///
    /// # Errors
    ///
    /// Returns [`VariantTableError`] if a catalog id or a combination repeats.
    pub fn new(variants: Vec<ReconciledVariant>) -> Result<Self, VariantTableError> {
        let mut by_catalog = HashMap::with_capacity(variants.len());
        let mut by_triple = HashMap::with_capacity(variants.len());

        for (i, v) in variants.iter().enumerate() {
            if by_catalog.insert(v.catalog_variant_id, i).is_some() {
                return Err(VariantTableError::DuplicateCatalogId(v.catalog_variant_id));
            }
            if by_triple
                .insert(triple(v.design, v.size, &v.color), i)
                .is_some()
            {
                return Err(VariantTableError::DuplicateCombination {
                    design: v.design,
                    size: v.size,
                    color: v.color.clone(),
                });
            }
        }

        Ok(Self {
            variants,
            by_catalog,
            by_triple,
        })
    }

    /// Parse and index a JSON table.
    ///
    /// # Errors
    ///
    /// Returns [`VariantTableError`] on malformed JSON or invariant violations.
    pub fn from_json(json: &str) -> Result<Self, VariantTableError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Serialize the table for writing to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.variants)
    }

    /// Exact lookup; color is matched case-insensitively.
    #[must_use]
    pub fn find(&self, design: Design, size: Size, color: &str) -> Option<&ReconciledVariant> {
        self.by_triple
            .get(&triple(design, size, color))
            .and_then(|i| self.variants.get(*i))
    }

    #[must_use]
    pub fn by_catalog_id(&self, id: CatalogVariantId) -> Option<&ReconciledVariant> {
        self.by_catalog.get(&id).and_then(|i| self.variants.get(*i))
    }

    #[must_use]
    pub fn by_external_id(&self, external_id: &str) -> Option<&ReconciledVariant> {
        self.variants
            .iter()
            .find(|v| v.external_id.as_deref() == Some(external_id))
    }

    pub fn by_design(&self, design: Design) -> impl Iterator<Item = &ReconciledVariant> {
        self.variants.iter().filter(move |v| v.design == design)
    }

    pub fn by_size(&self, size: Size) -> impl Iterator<Item = &ReconciledVariant> {
        self.variants.iter().filter(move |v| v.size == size)
    }

    pub fn by_color<'a>(&'a self, color: &'a str) -> impl Iterator<Item = &'a ReconciledVariant> {
        self.variants
            .iter()
            .filter(move |v| v.color.eq_ignore_ascii_case(color.trim()))
    }

    /// Designs present in the table, in [`Design::ALL`] order.
    #[must_use]
    pub fn designs(&self) -> Vec<Design> {
        Design::ALL
            .into_iter()
            .filter(|d| self.variants.iter().any(|v| v.design == *d))
            .collect()
    }

    /// Distinct colors offered with a design, in table order.
    #[must_use]
    pub fn colors(&self, design: Design) -> Vec<&str> {
        let mut colors: Vec<&str> = Vec::new();
        for v in self.by_design(design) {
            if !colors.iter().any(|c| c.eq_ignore_ascii_case(&v.color)) {
                colors.push(&v.color);
            }
        }
        colors
    }

    /// Distinct sizes, smallest first.
    #[must_use]
    pub fn sizes(&self) -> Vec<Size> {
        let mut sizes: Vec<Size> = self.variants.iter().map(|v| v.size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReconciledVariant> {
        self.variants.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
