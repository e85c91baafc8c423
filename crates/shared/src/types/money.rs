//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of decimal places every supported currency settles in.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(19, 2)` column holds: 99,999,999,999,999,999.99.
pub const MAX_AMOUNT: Decimal =
    Decimal::from_parts(2_313_682_943, 2_328_306_436, 0, false, MINOR_UNIT_SCALE);

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g., dollars, rupees).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

/// ISO 4217 currency codes accepted for donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Sri Lankan Rupee
    Lkr,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Converts the amount to integer minor units (cents).
    ///
    /// Returns `None` for negative amounts, fractional cents, or values that
    /// do not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        if self.amount.is_sign_negative() || !has_valid_scale(self.amount) {
            return None;
        }
        let minor = self.amount.checked_mul(Decimal::ONE_HUNDRED)?;
        i64::try_from(minor.trunc()).ok()
    }
}

/// Returns true if `amount` has no more than two significant decimal places.
#[must_use]
pub fn has_valid_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MINOR_UNIT_SCALE
}

impl Currency {
    /// Lowercase code as payment processors expect it.
    #[must_use]
    pub const fn as_lower(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Lkr => "lkr",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usd => write!(f, "USD"),
            Self::Lkr => write!(f, "LKR"),
            Self::Eur => write!(f, "EUR"),
            Self::Gbp => write!(f, "GBP"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "LKR" => Ok(Self::Lkr),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
