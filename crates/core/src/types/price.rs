//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are kept in the currency's standard unit (yuan, not fen) exactly
/// as the store returns them. Arithmetic never mixes currencies; the store
/// runs in a single currency chosen at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
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

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// This unit price multiplied by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add another amount of the same currency.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        debug_assert_eq!(self.currency_code, other.currency_code);
        Self::new(self.amount + other.amount, self.currency_code)
    }

    /// Format for display, e.g. `¥10.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Error returned when a currency code is not supported.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyCodeError(pub String);

/// ISO 4217 currency codes the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    CNY,
    USD,
    EUR,
    GBP,
    JPY,
}

impl CurrencyCode {
    /// Display symbol placed before the amount.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::CNY | Self::JPY => "¥",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CNY => "CNY",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::JPY => "JPY",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CNY" | "RMB" => Ok(Self::CNY),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "JPY" => Ok(Self::JPY),
            _ => Err(CurrencyCodeError(s.to_owned())),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_two_decimals() {
        let price = Price::new(Decimal::from(10), CurrencyCode::CNY);
        assert_eq!(price.display(), "¥10.00");
    }

    #[test]
    fn test_display_rounds() {
        let price = Price::new(Decimal::new(19_995, 3), CurrencyCode::USD);
        assert_eq!(price.display(), "$20.00");
    }

    #[test]
    fn test_times_and_plus() {
        let a = Price::new(Decimal::from(10), CurrencyCode::CNY).times(2);
        let b = Price::new(Decimal::from(5), CurrencyCode::CNY).times(1);
        assert_eq!(a.plus(b).amount, Decimal::from(25));
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("cny".parse::<CurrencyCode>(), Ok(CurrencyCode::CNY));
        assert_eq!(" usd ".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
