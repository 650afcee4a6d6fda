//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices come from the backend in US dollars. The storefront
//! displays them in Indian rupees using a fixed conversion rate.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed USD to INR conversion rate applied to every displayed price.
pub const USD_TO_INR_RATE: Decimal = Decimal::from_parts(83, 0, 0, false, 0);

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
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

    /// A price in US dollars, the currency the backend stores.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Convert to rupees. Prices already in INR are returned unchanged.
    #[must_use]
    pub fn to_inr(self) -> Self {
        match self.currency_code {
            CurrencyCode::INR => self,
            CurrencyCode::USD => Self::new(self.amount * USD_TO_INR_RATE, CurrencyCode::INR),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes used by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::INR => "₹",
        }
    }
}

/// Format a backend (USD) amount for display in rupees.
#[must_use]
pub fn format_price(usd_amount: Decimal) -> String {
    Price::usd(usd_amount).to_inr().to_string()
}
