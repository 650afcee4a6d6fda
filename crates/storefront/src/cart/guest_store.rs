//! Durable guest cart.

use async_trait::async_trait;
use duodude_core::{CartLine, CartSnapshot};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::storage::KeyValueStore;

/// Storage key for the guest cart.
pub const GUEST_CART_KEY: &str = "cart";

/// The cart kept on the device while nobody is signed in.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Load the saved cart.
    ///
    /// Never fails: missing, unreadable, or malformed content is an empty cart.
    async fn load(&self) -> CartSnapshot;

    /// Overwrite the saved cart.
    async fn save(&self, cart: &CartSnapshot) -> Result<()>;

    /// Forget the saved cart.
    async fn clear(&self) -> Result<()>;
}

/// [`GuestStore`] persisted as a JSON array under [`GUEST_CART_KEY`].
#[derive(Debug, Clone)]
pub struct LocalGuestStore<K> {
    store: K,
}

impl<K: KeyValueStore> LocalGuestStore<K> {
    #[must_use]
    pub const fn new(store: K) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<K: KeyValueStore> GuestStore for LocalGuestStore<K> {
    #[instrument(skip(self))]
    async fn load(&self) -> CartSnapshot {
        let raw = match self.store.get(GUEST_CART_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CartSnapshot::empty(),
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart, starting empty");
                return CartSnapshot::empty();
            }
        };

        let cart = parse_lines(&raw);
        debug!(lines = cart.len(), "Loaded guest cart");
        cart
    }

    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    async fn save(&self, cart: &CartSnapshot) -> Result<()> {
        let raw = serde_json::to_string(cart)?;
        self.store.set(GUEST_CART_KEY, &raw).await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.store.remove(GUEST_CART_KEY).await
    }
}

/// Parse a saved cart line by line.
///
/// Content that is not a JSON array yields an empty cart; individual lines
/// that do not parse (missing product id, zero quantity) are dropped.
fn parse_lines(raw: &str) -> CartSnapshot {
    let values = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "Discarding malformed guest cart");
            return CartSnapshot::empty();
        }
    };

    CartSnapshot::from_lines(values.into_iter().filter_map(|value| {
        serde_json::from_value::<CartLine>(value)
            .inspect_err(|e| warn!(error = %e, "Dropping malformed guest cart line"))
            .ok()
    }))
}
