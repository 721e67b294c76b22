//! Catalog vocabulary: print designs, garment sizes and product types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Print design variant. Dark prints go on light garments and vice versa,
/// so each design carries its own color range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Design {
    Dark,
    Light,
}

impl Design {
    pub const ALL: [Self; 2] = [Self::Dark, Self::Light];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "DARK",
            Self::Light => "LIGHT",
        }
    }
}

impl fmt::Display for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Design {
    type Err = CatalogParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DARK" => Ok(Self::Dark),
            "LIGHT" => Ok(Self::Light),
            _ => Err(CatalogParseError::Design(s.to_owned())),
        }
    }
}

/// Garment size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Size {
    S,
    M,
    L,
    XL,
    #[serde(rename = "2XL")]
    XXL,
    #[serde(rename = "3XL")]
    XXXL,
    #[serde(rename = "4XL")]
    XXXXL,
    #[serde(rename = "5XL")]
    XXXXXL,
    #[serde(rename = "One Size")]
    OneSize,
}

impl Size {
    /// Order in which reconciliation walks sizes.
    pub const STANDARD: [Self; 5] = [Self::S, Self::M, Self::L, Self::XL, Self::XXL];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::XL => "XL",
            Self::XXL => "2XL",
            Self::XXXL => "3XL",
            Self::XXXXL => "4XL",
            Self::XXXXXL => "5XL",
            Self::OneSize => "One Size",
        }
    }

    /// Sizes outside [`Size::STANDARD`], in the order their ids follow it.
    pub const EXTENDED: [Self; 4] = [Self::XXXL, Self::XXXXL, Self::XXXXXL, Self::OneSize];

    /// Position in [`Size::STANDARD`], if any.
    #[must_use]
    pub fn standard_index(self) -> Option<usize> {
        Self::STANDARD.iter().position(|s| *s == self)
    }

    /// Fixed position of the size across all sizes: standard sizes first,
    /// then [`Size::EXTENDED`]. Independent of which sizes a product offers.
    #[must_use]
    pub fn catalog_index(self) -> usize {
        self.standard_index().unwrap_or_else(|| {
            Self::STANDARD.len()
                + Self::EXTENDED
                    .iter()
                    .position(|s| *s == self)
                    .unwrap_or(Self::EXTENDED.len())
        })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = CatalogParseError;

    /// Accepts the spellings Printful and older tables use (`XXL`, `one size`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "S" | "SMALL" => Ok(Self::S),
            "M" | "MEDIUM" => Ok(Self::M),
            "L" | "LARGE" => Ok(Self::L),
            "XL" => Ok(Self::XL),
            "2XL" | "XXL" => Ok(Self::XXL),
            "3XL" | "XXXL" => Ok(Self::XXXL),
            "4XL" | "XXXXL" => Ok(Self::XXXXL),
            "5XL" | "XXXXXL" => Ok(Self::XXXXXL),
            "ONE SIZE" | "ONESIZE" | "OS" => Ok(Self::OneSize),
            _ => Err(CatalogParseError::Size(s.to_owned())),
        }
    }
}

/// Product category used to pick color ranges and file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Tshirt,
    Hoodie,
    Cap,
    Mug,
    Totebag,
    Waterbottle,
    Mousepad,
    Other,
}

impl ProductType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tshirt => "tshirt",
            Self::Hoodie => "hoodie",
            Self::Cap => "cap",
            Self::Mug => "mug",
            Self::Totebag => "totebag",
            Self::Waterbottle => "waterbottle",
            Self::Mousepad => "mousepad",
            Self::Other => "other",
        }
    }

    /// Guess the product type from Printful's product name and external id.
    ///
    /// The external id is checked first since store owners set it on purpose;
    /// the display name is the fallback.
    #[must_use]
    pub fn detect(name: &str, external_id: Option<&str>) -> Self {
        let external = external_id.unwrap_or_default().to_lowercase();
        let name = name.to_lowercase();

        let from_external: [(Self, &[&str]); 7] = [
            (Self::Tshirt, &["tshirt", "tee", "t-shirt"]),
            (Self::Hoodie, &["hoodie", "sweatshirt"]),
            (Self::Cap, &["cap", "hat"]),
            (Self::Mug, &["mug"]),
            (Self::Totebag, &["tote", "bag"]),
            (Self::Waterbottle, &["bottle", "water"]),
            (Self::Mousepad, &["mouse", "pad"]),
        ];
        let from_name: [(Self, &[&str]); 7] = [
            (Self::Tshirt, &["tee", "t-shirt", "tshirt"]),
            (Self::Hoodie, &["hoodie", "sweatshirt"]),
            (Self::Cap, &["cap", "hat", "trucker"]),
            (Self::Mug, &["mug"]),
            (Self::Totebag, &["tote"]),
            (Self::Waterbottle, &["bottle"]),
            (Self::Mousepad, &["mouse"]),
        ];

        let matches = |haystack: &str, rules: &[(Self, &[&str])]| {
            rules
                .iter()
                .find(|(_, needles)| needles.iter().any(|n| haystack.contains(n)))
                .map(|(kind, _)| *kind)
        };

        matches(&external, &from_external)
            .or_else(|| matches(&name, &from_name))
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CatalogParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tshirt" | "t-shirt" | "tshirts" => Ok(Self::Tshirt),
            "hoodie" | "hoodies" => Ok(Self::Hoodie),
            "cap" | "caps" => Ok(Self::Cap),
            "mug" | "mugs" => Ok(Self::Mug),
            "totebag" | "tote" => Ok(Self::Totebag),
            "waterbottle" => Ok(Self::Waterbottle),
            "mousepad" => Ok(Self::Mousepad),
            "other" => Ok(Self::Other),
            _ => Err(CatalogParseError::ProductType(s.to_owned())),
        }
    }
}

/// Unrecognized catalog vocabulary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogParseError {
    #[error("unknown design: {0}")]
    Design(String),
    #[error("unknown size: {0}")]
    Size(String),
    #[error("unknown product type: {0}")]
    ProductType(String),
}
