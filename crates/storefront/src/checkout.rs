//! Checkout: turn the reconciled cart into an order.

use duodude_core::{CheckoutSummary, Order, ShippingAddress};
use tracing::{instrument, warn};

use crate::api::OrdersClient;
use crate::auth::AuthState;
use crate::cart::{CartReconciler, GuestStore, RemoteCart};
use crate::error::{Result, StorefrontError};

/// Totals for the cart as it stands.
///
/// # Errors
///
/// Returns an error if the cart cannot be loaded.
pub async fn summary<G: GuestStore, R: RemoteCart>(
    cart: &CartReconciler<G, R>,
) -> Result<CheckoutSummary> {
    Ok(CheckoutSummary::from_snapshot(&cart.snapshot().await?))
}

/// Place a cash-on-delivery order for the current cart, then empty the cart.
///
/// A failure to empty the cart afterwards is logged, not returned: the
/// order already exists.
///
/// # Errors
///
/// Returns `StorefrontError::Unauthorized` when signed out,
/// `StorefrontError::BadRequest` for an empty cart or incomplete address,
/// or the backend's error if the order is refused.
#[instrument(skip_all)]
pub async fn place_order<G: GuestStore, R: RemoteCart>(
    cart: &CartReconciler<G, R>,
    orders: &OrdersClient,
    auth: &AuthState,
    address: &ShippingAddress,
) -> Result<Order> {
    let token = auth
        .credential()
        .ok_or_else(|| StorefrontError::Unauthorized("sign in to place an order".to_string()))?;

    let snapshot = cart.snapshot().await?;
    let order = orders.place_order(token, &snapshot, address).await?;

    if let Err(e) = cart.clear().await {
        warn!(error = %e, order_id = %order.id, "Order placed but the cart was not emptied");
    }

    Ok(order)
}
