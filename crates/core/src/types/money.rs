//! Money helpers using decimal arithmetic.
//!
//! Prices are held as [`Decimal`] rupees everywhere in the storefront. The
//! payment gateway only accepts integer minor units (paise), so the single
//! conversion point is [`to_minor_units`], which rounds half away from zero
//! instead of truncating.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Indian rupee.
    #[default]
    INR,
}

impl CurrencyCode {
    /// The ISO 4217 code as sent to the gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            other => Err(MoneyError::UnsupportedCurrency(other.to_string())),
        }
    }
}

/// Errors from money conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Amounts charged through the gateway cannot be negative.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit into an `i64` of minor units.
    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),
    /// Currency other than the ones the storefront sells in.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Convert a rupee amount into paise, rounding half away from zero.
///
/// ```
/// use nutriio_core::to_minor_units;
/// use rust_decimal::Decimal;
///
/// assert_eq!(to_minor_units(Decimal::new(64_000, 2)).unwrap(), 64_000);
/// assert_eq!(to_minor_units(Decimal::new(10_005, 3)).unwrap(), 1_001);
/// ```
///
/// # Errors
///
/// Returns [`MoneyError::Negative`] for negative input and
/// [`MoneyError::OutOfRange`] when the result overflows `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount < Decimal::ZERO {
        return Err(MoneyError::Negative(amount));
    }

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|paise| paise.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|paise| paise.to_i64())
        .ok_or(MoneyError::OutOfRange(amount))
}

/// Format a rupee amount for messages, e.g. `₹640` or `₹99.5`.
#[must_use]
pub fn format_rupees(amount: Decimal) -> String {
    format!(
        "{}{}",
        CurrencyCode::INR.symbol(),
        amount.round_dp(2).normalize()
    )
}
