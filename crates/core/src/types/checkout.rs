//! Checkout totals and shipping details.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartSnapshot;

/// Subtotal above which shipping is free, in US dollars.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Flat shipping charge below the free-shipping threshold, in US dollars.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Sales tax applied to the subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Order totals shown at checkout, all in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutSummary {
    /// Compute totals for the given cart.
    #[must_use]
    pub fn from_snapshot(cart: &CartSnapshot) -> Self {
        let subtotal = cart.subtotal();
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let tax = subtotal * TAX_RATE;

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

/// Where an order ships to.
///
/// Order documents written by older backends use `address`/`zipCode`; both
/// spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "address")]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "zipCode")]
    pub zip: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingAddress {
    /// Whether every field has been filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.street, &self.city, &self.zip, &self.country]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}
