//! Cart reconciliation.
//!
//! # Architecture
//!
//! - [`GuestStore`] - the durable cart kept on the device while signed out
//! - [`RemoteCart`] - the backend cart tied to a credential
//!   ([`crate::api::CartClient`] in production)
//! - [`CartReconciler`] - owns the one in-memory [`CartSnapshot`], decides
//!   which store is authoritative, and migrates the guest cart into the
//!   remote cart on sign-in
//!
//! [`CartSnapshot`]: duodude_core::CartSnapshot

mod guest_store;
mod reconciler;

use std::sync::Arc;

use async_trait::async_trait;
use duodude_core::{CartSnapshot, ProductId, Quantity};

use crate::auth::AuthToken;
use crate::error::Result;

pub use guest_store::{GUEST_CART_KEY, GuestStore, LocalGuestStore};
pub use reconciler::{CartEvent, CartReconciler, CartSource, Phase, Reconciliation};

/// The backend cart for a signed-in user.
///
/// Implementations must report a rejected credential as
/// [`StorefrontError::Unauthorized`](crate::StorefrontError::Unauthorized)
/// so the reconciler can tell it apart from a network failure.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// The full remote cart.
    async fn fetch(&self, token: &AuthToken) -> Result<CartSnapshot>;

    /// Add units of a product; the backend merges by product and size and
    /// answers with the full cart.
    async fn add_line(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<CartSnapshot>;

    /// Set the quantity of one line, identified by product and size.
    async fn set_quantity(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<()>;

    /// Remove every line of a product, across sizes.
    async fn remove_line(&self, token: &AuthToken, product: &ProductId) -> Result<()>;

    /// Empty the cart.
    async fn clear(&self, token: &AuthToken) -> Result<()>;
}

#[async_trait]
impl<T: RemoteCart + ?Sized> RemoteCart for Arc<T> {
    async fn fetch(&self, token: &AuthToken) -> Result<CartSnapshot> {
        (**self).fetch(token).await
    }

    async fn add_line(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<CartSnapshot> {
        (**self).add_line(token, product, quantity, size).await
    }

    async fn set_quantity(
        &self,
        token: &AuthToken,
        product: &ProductId,
        quantity: Quantity,
        size: Option<&str>,
    ) -> Result<()> {
        (**self).set_quantity(token, product, quantity, size).await
    }

    async fn remove_line(&self, token: &AuthToken, product: &ProductId) -> Result<()> {
        (**self).remove_line(token, product).await
    }

    async fn clear(&self, token: &AuthToken) -> Result<()> {
        (**self).clear(token).await
    }
}
