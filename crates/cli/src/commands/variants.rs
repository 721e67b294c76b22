//! Variant table commands.
//!
//! # Usage
//!
//! ```bash
//! # Map combinations through a Printful catalog table
//! rs-cli variants reconcile --combinations hoodie-combos.json \
//!     --table hoodie-catalog.json --out data/hoodie-variants.json
//!
//! # Same, with deterministic placeholder ids
//! rs-cli variants reconcile --combinations hoodie-combos.json --synthetic \
//!     --out data/hoodie-variants.json
//!
//! # Find one variant
//! rs-cli variants lookup --table data/hoodie-variants.json --design DARK --size M --color Black
//! ```
//!
//! `--combinations` is a JSON array of `{design, color, size}` objects;
//! `--table` is a JSON object from `"DARK-Color1-S"` style keys to catalog
//! variant ids.

use std::path::Path;

use reform_shop_core::reconcile::{CatalogTable, IdSource, SyntheticScheme, reconcile};
use reform_shop_core::{Design, Size, VariantCombination, VariantTable};

use super::{CommandError, read_file, read_json, write_file};

/// Reconcile combinations and write the resulting table.
///
/// Nothing is written unless reconciliation succeeds.
///
/// # Errors
///
/// Returns an error if an input cannot be read, a combination repeats, or
/// two combinations resolve to the same catalog id.
pub fn reconcile_table(
    combinations: &Path,
    table: Option<&Path>,
    out: &Path,
) -> Result<(), CommandError> {
    let combinations: Vec<VariantCombination> = read_json(combinations)?;
    let catalog = table.map(read_json::<CatalogTable>).transpose()?;

    let source = catalog
        .as_ref()
        .map_or(IdSource::Synthetic(SyntheticScheme::default()), IdSource::Table);

    let result = reconcile(&combinations, source)?;

    for unmapped in &result.unmapped {
        tracing::warn!(
            combination = %unmapped.key,
            lookup_key = %unmapped.lookup_key,
            "No catalog id for combination"
        );
    }

    let table = VariantTable::new(result.variants)?;
    let json = table.to_json_pretty().map_err(|source| CommandError::Json {
        path: out.to_path_buf(),
        source,
    })?;
    write_file(out, &json)?;

    tracing::info!(
        mapped = table.len(),
        unmapped = result.unmapped.len(),
        out = %out.display(),
        "Variant table written"
    );
    Ok(())
}

/// Print the variant for a design, size and color.
///
/// # Errors
///
/// Returns an error if the table is invalid or has no such variant.
pub fn lookup(table: &Path, design: Design, size: Size, color: &str) -> Result<(), CommandError> {
    let table = VariantTable::from_json(&read_file(table)?)?;

    let variant = table.find(design, size, color).ok_or_else(|| {
        CommandError::Failed(format!("no variant for {design} {color} {size}"))
    })?;

    let json = serde_json::to_string_pretty(variant).map_err(|e| CommandError::Failed(e.to_string()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
