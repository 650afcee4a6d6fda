//! Orders client.
//!
//! # Endpoints
//!
//! - `GET /api/orders/myorders` - the signed-in user's orders
//! - `GET /api/orders` - every order (admin role)
//! - `POST /api/orders` - place an order for the current cart
//! - `PUT /api/orders/{id}/cancel` - cancel an order
//! - `POST /api/returns` - request a return for a delivered order

use duodude_core::{
    CartSnapshot, CheckoutSummary, Order, OrderId, ProductId, ReturnRequest, ShippingAddress,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use super::ApiClient;
use crate::auth::AuthToken;
use crate::error::{self, Result, StorefrontError};

const ORDERS_PATH: &str = "api/orders";
const MY_ORDERS_PATH: &str = "api/orders/myorders";
const RETURNS_PATH: &str = "api/returns";

/// Cash on delivery is the only payment method the backend accepts.
const PAYMENT_METHOD: &str = "cod";

/// Client for the orders API. Every call requires a credential.
#[derive(Debug, Clone)]
pub struct OrdersClient {
    api: ApiClient,
}

impl OrdersClient {
    /// Create an orders client over the shared API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Orders placed by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &AuthToken) -> Result<Vec<Order>> {
        self.api.get(self.api.url(MY_ORDERS_PATH)?, Some(token)).await
    }

    /// Every order in the store. Requires the admin role.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthorized` for non-admin credentials.
    #[instrument(skip(self, token))]
    pub async fn all_orders(&self, token: &AuthToken) -> Result<Vec<Order>> {
        self.api.get(self.api.url(ORDERS_PATH)?, Some(token)).await
    }

    /// Place a cash-on-delivery order for the cart.
    ///
    /// The total sent is the checkout total (subtotal, shipping and tax).
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::BadRequest` for an empty cart or an
    /// incomplete address, without contacting the backend.
    #[instrument(skip_all, fields(lines = cart.len()))]
    pub async fn place_order(
        &self,
        token: &AuthToken,
        cart: &CartSnapshot,
        address: &ShippingAddress,
    ) -> Result<Order> {
        if cart.is_empty() {
            return Err(StorefrontError::BadRequest("cart is empty".to_string()));
        }
        if !address.is_complete() {
            return Err(StorefrontError::BadRequest(
                "shipping address is incomplete".to_string(),
            ));
        }

        let body = PlaceOrderRequest::new(cart, address);
        let order: Order = self
            .api
            .send_json(Method::POST, self.api.url(ORDERS_PATH)?, Some(token), &body)
            .await?;

        info!(order_id = %order.id, total = %order.total, "Order placed");
        error::add_breadcrumb("order", "Placed order", Some(&[("order_id", order.id.as_str())]));
        Ok(order)
    }

    /// Cancel an order that has not shipped yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the cancellation.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn cancel_order(&self, token: &AuthToken, id: &OrderId) -> Result<()> {
        let mut url = self.api.url(ORDERS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::BadRequest("API base URL cannot hold a path".to_string()))?
            .extend([id.as_str(), "cancel"]);

        self.api.send_empty(Method::PUT, url, Some(token)).await?;

        info!("Order cancelled");
        error::add_breadcrumb("order", "Cancelled order", Some(&[("order_id", id.as_str())]));
        Ok(())
    }

    /// Ask for items of a delivered order to be taken back.
    ///
    /// The backend queues the request for admin approval.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::BadRequest` for a request without items or
    /// reason, without contacting the backend.
    #[instrument(skip_all, fields(order_id = %request.order_id, items = request.items.len()))]
    pub async fn request_return(&self, token: &AuthToken, request: &ReturnRequest) -> Result<()> {
        if request.items.is_empty() {
            return Err(StorefrontError::BadRequest(
                "return request has no items".to_string(),
            ));
        }
        if request.reason.trim().is_empty() {
            return Err(StorefrontError::BadRequest(
                "return request needs a reason".to_string(),
            ));
        }

        self.api
            .send_json_ignored(Method::POST, self.api.url(RETURNS_PATH)?, Some(token), request)
            .await?;

        info!("Return requested");
        error::add_breadcrumb(
            "order",
            "Requested return",
            Some(&[("order_id", request.order_id.as_str())]),
        );
        Ok(())
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderRequest<'a> {
    items: Vec<OrderLineRequest<'a>>,
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
    shipping_address: &'a ShippingAddress,
    payment_method: &'static str,
}

#[derive(Debug, Serialize)]
struct OrderLineRequest<'a> {
    product: &'a ProductId,
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
}

impl<'a> PlaceOrderRequest<'a> {
    fn new(cart: &'a CartSnapshot, address: &'a ShippingAddress) -> Self {
        let items = cart
            .lines()
            .iter()
            .map(|line| OrderLineRequest {
                product: &line.product.id,
                quantity: line.quantity.get(),
                size: line.size.as_deref(),
            })
            .collect();

        Self {
            items,
            total: CheckoutSummary::from_snapshot(cart).total.round_dp(2),
            shipping_address: address,
            payment_method: PAYMENT_METHOD,
        }
    }
}
