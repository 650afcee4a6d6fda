//! Order history types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::checkout::ShippingAddress;
use super::id::{OrderId, ProductId};
use super::product::ProductRef;
use super::status::OrderStatus;

/// A placed order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

impl Order {
    /// Total number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// One item of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductRef,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// A request to send back items of a delivered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub order_id: OrderId,
    pub items: Vec<ReturnItem>,
    pub reason: String,
}

impl ReturnRequest {
    /// Return every item of the order for the same reason.
    #[must_use]
    pub fn whole_order(order: &Order, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let items = order
            .items
            .iter()
            .map(|item| ReturnItem {
                product: item.product.id().clone(),
                quantity: item.quantity,
                size: item.size.clone(),
                reason: reason.clone(),
            })
            .collect();

        Self {
            order_id: order.id.clone(),
            items,
            reason,
        }
    }
}

/// One item of a return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub product: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub reason: String,
}
