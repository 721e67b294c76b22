//! Type-safe price representation using decimal arithmetic.
//!
//! Stripe and the database both speak in minor units (pence); templates and
//! logs want `£12.34`. [`Price`] sits between the two.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (pounds, not pence).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Build a price from an amount in minor units (e.g. Stripe's `amount_total`).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Amount in minor units, rounded half-away-from-zero to two places.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        let scaled = (self.amount * Decimal::ONE_HUNDRED).round();
        i64::try_from(scaled).unwrap_or(i64::MAX)
    }

    /// Format for display (e.g. `£19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    GBP,
    EUR,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GBP => "£",
            Self::EUR => "€",
            Self::USD => "$",
        }
    }

    /// Lowercase ISO code as Stripe sends it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GBP => "gbp",
            Self::EUR => "eur",
            Self::USD => "usd",
        }
    }

    /// Parse Stripe's currency string, case-insensitively.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "gbp" => Some(Self::GBP),
            "eur" => Some(Self::EUR),
            "usd" => Some(Self::USD),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_display_as_pounds() {
        let price = Price::from_minor_units(2499, CurrencyCode::GBP);
        assert_eq!(price.display(), "£24.99");
        assert_eq!(price.to_minor_units(), 2499);
    }

    #[test]
    fn whole_pounds_keep_two_places() {
        let price = Price::new(Decimal::from(10), CurrencyCode::GBP);
        assert_eq!(price.to_string(), "£10.00");
    }

    #[test]
    fn currency_parse_is_case_insensitive() {
        assert_eq!(CurrencyCode::parse("GBP"), Some(CurrencyCode::GBP));
        assert_eq!(CurrencyCode::parse("jpy"), None);
    }
}
