//! Remote cart service client.
//!
//! # Endpoints
//!
//! - `GET /api/cart` - current cart
//! - `POST /api/cart` - add `{productId, quantity, size}`, returns the full cart
//! - `POST /api/cart/{productId}/quantity` - set `{quantity, size}` on one line
//! - `DELETE /api/cart/{productId}` - remove every line of a product
//! - `DELETE /api/cart` - empty the cart
//!
//! All endpoints require a bearer credential and answer with
//! `{ "items": [{ "product", "quantity", "size" }] }`.

use async_trait::async_trait;
use duodude_core::{CartLine, CartSnapshot, ProductId, ProductRef, Quantity};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::ApiClient;
use crate::auth::AuthToken;
use crate::cart::RemoteCart;
use crate::error::{Result, StorefrontError};

const CART_PATH: &str = "api/cart";

/// Client for the backend cart API.
#[derive(Debug, Clone)]
pub struct CartClient {
    api: ApiClient,
}

impl CartClient {
    /// Create a cart client over the shared API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RemoteCart for CartClient {
    #[instrument(skip(self, token))]
    async fn fetch(&self, token: &AuthToken) -> Result<CartSnapshot> {
        let response: CartResponse = self.api.get(self.api.url(CART_PATH)?, Some(token)).await?;
        Ok(response.into_snapshot())
    }

    #[instrument(skip_all, fields(product_id = %product, quantity = %quantity))]
    async fn add_line(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<CartSnapshot> {
        let body = AddLineRequest {
            product_id: product,
            quantity: quantity.get(),
            size,
        };

        let response: CartResponse = self
            .api
            .send_json(Method::POST, self.api.url(CART_PATH)?, Some(token), &body)
            .await?;
        Ok(response.into_snapshot())
    }

    #[instrument(skip_all, fields(product_id = %product, quantity = %quantity))]
    async fn set_quantity(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<()> {
        let mut url = self.api.url(CART_PATH)?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::BadRequest("API base URL cannot hold a path".to_string()))?
            .extend([product.as_str(), "quantity"]);

        let body = SetQuantityRequest {
            quantity: quantity.get(),
            size,
        };
        self.api
            .send_json_ignored(Method::POST, url, Some(token), &body)
            .await
    }

    #[instrument(skip_all, fields(product_id = %product))]
    async fn remove_line(&self, token: &AuthToken, product: &ProductId) -> Result<()> {
        let mut url = self.api.url(CART_PATH)?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::BadRequest("API base URL cannot hold a path".to_string()))?
            .push(product.as_str());

        self.api.send_empty(Method::DELETE, url, Some(token)).await
    }

    #[instrument(skip(self, token))]
    async fn clear(&self, token: &AuthToken) -> Result<()> {
        self.api
            .send_empty(Method::DELETE, self.api.url(CART_PATH)?, Some(token))
            .await
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddLineRequest<'a> {
    product_id: &'a ProductId,
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SetQuantityRequest<'a> {
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct CartResponse {
    #[serde(default)]
    items: Vec<CartItemResponse>,
}

#[derive(Debug, Deserialize)]
struct CartItemResponse {
    product: ProductRef,
    quantity: u32,
    #[serde(default)]
    size: Option<String>,
}

impl CartResponse {
    /// Convert to a snapshot, dropping lines the server reports with no units.
    fn into_snapshot(self) -> CartSnapshot {
        CartSnapshot::from_lines(self.items.into_iter().filter_map(|item| {
            let Some(quantity) = Quantity::new(item.quantity) else {
                warn!(product_id = %item.product.id(), "Dropping cart line with zero quantity");
                return None;
            };
            // Blank sizes are stored by some clients; treat them as "no size".
            let size = item.size.filter(|s| !s.trim().is_empty());
            Some(CartLine::new(item.product.into_product(), quantity, size))
        }))
    }
}
