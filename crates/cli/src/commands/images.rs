//! Image flag audit.
//!
//! ```bash
//! rs-cli images check
//! ```
//!
//! Exits non-zero when any product has more than one primary or thumbnail
//! image.

use reform_shop_core::images::check_flags;
use reform_shop_functions::db::catalog::CatalogRepository;

use super::{CommandError, connect};

/// Report products with duplicate primary or thumbnail flags.
///
/// # Errors
///
/// Returns `CommandError::Failed` if any violation is found.
pub async fn check() -> Result<(), CommandError> {
    let pool = connect().await?;
    let images = CatalogRepository::new(&pool).all_images().await?;

    let violations = check_flags(&images);
    for violation in &violations {
        let ids: Vec<String> = violation.image_ids.iter().map(ToString::to_string).collect();
        tracing::error!(
            product_id = %violation.product_id,
            flag = ?violation.flag,
            images = %ids.join(","),
            "Image flag held by more than one image"
        );
    }

    if violations.is_empty() {
        tracing::info!(images = images.len(), "Image flags OK");
        Ok(())
    } else {
        Err(CommandError::Failed(format!(
            "{} image flag violation(s)",
            violations.len()
        )))
    }
}
