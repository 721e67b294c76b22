//! Status and tag enums stored alongside rows.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order recorded from a Stripe checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    #[default]
    Paid,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a product image came from.
///
/// `Custom` images were uploaded by an admin and are owned by people, not by
/// any sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Custom,
    Printful,
}

impl ImageSource {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Printful => "printful",
        }
    }

    /// Whether automated jobs may touch images with this source.
    #[must_use]
    pub const fn is_sync_managed(self) -> bool {
        matches!(self, Self::Printful)
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom" => Ok(Self::Custom),
            "printful" => Ok(Self::Printful),
            _ => Err(format!("invalid image source: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn image_source_roundtrips_through_str() {
        for source in [ImageSource::Custom, ImageSource::Printful] {
            assert_eq!(source.as_str().parse::<ImageSource>().unwrap(), source);
        }
        assert!("upload".parse::<ImageSource>().is_err());
    }

    #[test]
    fn only_printful_images_are_sync_managed() {
        assert!(ImageSource::Printful.is_sync_managed());
        assert!(!ImageSource::Custom.is_sync_managed());
    }

    #[test]
    fn order_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Paid).unwrap(),
            "\"paid\""
        );
    }
}
