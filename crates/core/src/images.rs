//! Product image sync planning.
//!
//! A product's gallery mixes images pulled from Printful with images an
//! admin uploaded by hand. Sync jobs compute an [`ImageSyncPlan`] here and
//! then apply it; the plan only ever inserts new Printful images or deletes
//! stale Printful images. Custom images are never updated, reordered or
//! deleted, and keep their primary/thumbnail flags.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{ImageId, ImageSource, ProductId};

/// A stored product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub image_url: String,
    pub image_order: i32,
    pub is_primary: bool,
    pub is_thumbnail: bool,
    pub source: ImageSource,
    #[serde(default)]
    pub color: Option<String>,
}

/// An image Printful currently offers for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingImage {
    pub url: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A Printful image to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewImage {
    pub image_url: String,
    pub image_order: i32,
    pub is_primary: bool,
    pub is_thumbnail: bool,
    pub color: Option<String>,
}

impl NewImage {
    /// Images created by sync are always Printful-sourced.
    #[must_use]
    pub const fn source(&self) -> ImageSource {
        ImageSource::Printful
    }
}

/// Changes a sync run will make to one product's images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageSyncPlan {
    pub insert: Vec<NewImage>,
    /// Printful images no longer offered upstream.
    pub delete: Vec<ImageId>,
    /// Custom images left as they are.
    pub preserved_custom: usize,
}

impl ImageSyncPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

/// Plan the sync of one product's images against what Printful offers now.
///
/// `existing` must all belong to the same product.
#[must_use]
pub fn plan_image_sync(existing: &[ProductImage], incoming: &[IncomingImage]) -> ImageSyncPlan {
    let offered: HashSet<&str> = incoming.iter().map(|i| i.url.as_str()).collect();

    let delete: Vec<ImageId> = existing
        .iter()
        .filter(|img| img.source.is_sync_managed() && !offered.contains(img.image_url.as_str()))
        .map(|img| img.id)
        .collect();

    let kept: Vec<&ProductImage> = existing
        .iter()
        .filter(|img| !delete.contains(&img.id))
        .collect();

    let mut known: HashSet<&str> = kept.iter().map(|img| img.image_url.as_str()).collect();
    let mut next_order = kept.iter().map(|img| img.image_order).max().map_or(0, |m| m + 1);
    let mut primary_taken = kept.iter().any(|img| img.is_primary);
    let mut thumbnail_taken = kept.iter().any(|img| img.is_thumbnail);

    let mut insert = Vec::new();
    for image in incoming {
        if !known.insert(image.url.as_str()) {
            continue;
        }
        insert.push(NewImage {
            image_url: image.url.clone(),
            image_order: next_order,
            is_primary: !primary_taken,
            is_thumbnail: !thumbnail_taken,
            color: image.color.clone(),
        });
        next_order += 1;
        primary_taken = true;
        thumbnail_taken = true;
    }

    ImageSyncPlan {
        insert,
        delete,
        preserved_custom: existing
            .iter()
            .filter(|img| img.source == ImageSource::Custom)
            .count(),
    }
}

/// Which single-holder flag is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFlag {
    Primary,
    Thumbnail,
}

/// A product with more than one image holding a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagViolation {
    pub product_id: ProductId,
    pub flag: ImageFlag,
    pub image_ids: Vec<ImageId>,
}

/// Find products where more than one image is primary or thumbnail.
#[must_use]
pub fn check_flags(images: &[ProductImage]) -> Vec<FlagViolation> {
    let mut by_product: BTreeMap<uuid::Uuid, Vec<&ProductImage>> = BTreeMap::new();
    for image in images {
        by_product
            .entry(image.product_id.as_uuid())
            .or_default()
            .push(image);
    }

    let mut violations = Vec::new();
    for group in by_product.values() {
        let primaries: Vec<&ProductImage> = group.iter().copied().filter(|i| i.is_primary).collect();
        let thumbnails: Vec<&ProductImage> =
            group.iter().copied().filter(|i| i.is_thumbnail).collect();

        for (flag, holders) in [
            (ImageFlag::Primary, primaries),
            (ImageFlag::Thumbnail, thumbnails),
        ] {
            if holders.len() < 2 {
                continue;
            }
            if let Some(first) = holders.first() {
                violations.push(FlagViolation {
                    product_id: first.product_id,
                    flag,
                    image_ids: holders.iter().map(|i| i.id).collect(),
                });
            }
        }
    }
    violations
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn image(product: ProductId, url: &str, order: i32, source: ImageSource) -> ProductImage {
        ProductImage {
            id: ImageId::new_v4(),
            product_id: product,
            image_url: url.to_owned(),
            image_order: order,
            is_primary: false,
            is_thumbnail: false,
            source,
            color: None,
        }
    }

    fn incoming(urls: &[&str]) -> Vec<IncomingImage> {
        urls.iter()
            .map(|u| IncomingImage {
                url: (*u).to_owned(),
                color: None,
            })
            .collect()
    }

    #[test]
    fn custom_images_are_never_deleted() {
        let product = ProductId::new_v4();
        let mut custom = image(product, "https://cdn/custom.jpg", 0, ImageSource::Custom);
        custom.is_primary = true;
        custom.is_thumbnail = true;
        let stale = image(product, "https://printful/old.jpg", 1, ImageSource::Printful);

        let plan = plan_image_sync(
            &[custom.clone(), stale.clone()],
            &incoming(&["https://printful/new.jpg"]),
        );

        assert_eq!(plan.delete, vec![stale.id]);
        assert!(!plan.delete.contains(&custom.id));
        assert_eq!(plan.preserved_custom, 1);
    }

    #[test]
    fn custom_flags_are_not_taken_over() {
        let product = ProductId::new_v4();
        let mut custom = image(product, "https://cdn/custom.jpg", 0, ImageSource::Custom);
        custom.is_primary = true;
        custom.is_thumbnail = true;

        let plan = plan_image_sync(&[custom], &incoming(&["https://printful/a.jpg"]));

        assert_eq!(plan.insert.len(), 1);
        assert!(!plan.insert[0].is_primary);
        assert!(!plan.insert[0].is_thumbnail);
        assert_eq!(plan.insert[0].image_order, 1);
    }

    #[test]
    fn first_new_image_gets_flags_when_product_has_none() {
        let plan = plan_image_sync(
            &[],
            &incoming(&["https://printful/a.jpg", "https://printful/b.jpg"]),
        );

        assert_eq!(plan.insert.len(), 2);
        assert!(plan.insert[0].is_primary && plan.insert[0].is_thumbnail);
        assert!(!plan.insert[1].is_primary && !plan.insert[1].is_thumbnail);
        assert_eq!(plan.insert[1].image_order, 1);
    }

    #[test]
    fn urls_already_present_are_not_reinserted() {
        let product = ProductId::new_v4();
        let custom = image(product, "https://shared/front.jpg", 0, ImageSource::Custom);
        let printful = image(product, "https://printful/a.jpg", 1, ImageSource::Printful);

        let plan = plan_image_sync(
            &[custom, printful],
            &incoming(&[
                "https://shared/front.jpg",
                "https://printful/a.jpg",
                "https://printful/a.jpg",
            ]),
        );

        assert!(plan.is_empty());
    }

    #[test]
    fn replacing_a_primary_printful_image_passes_the_flag_on() {
        let product = ProductId::new_v4();
        let mut old = image(product, "https://printful/old.jpg", 0, ImageSource::Printful);
        old.is_primary = true;

        let plan = plan_image_sync(&[old.clone()], &incoming(&["https://printful/new.jpg"]));

        assert_eq!(plan.delete, vec![old.id]);
        assert!(plan.insert[0].is_primary);
        assert_eq!(plan.insert[0].image_order, 0);
    }

    #[test]
    fn check_flags_reports_multiple_primaries() {
        let product = ProductId::new_v4();
        let mut a = image(product, "a", 0, ImageSource::Custom);
        let mut b = image(product, "b", 1, ImageSource::Printful);
        a.is_primary = true;
        b.is_primary = true;
        a.is_thumbnail = true;

        let other = ProductId::new_v4();
        let mut c = image(other, "c", 0, ImageSource::Printful);
        c.is_primary = true;

        let violations = check_flags(&[a.clone(), b.clone(), c]);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].flag, ImageFlag::Primary);
        assert_eq!(violations[0].image_ids, vec![a.id, b.id]);
    }
}
