//! Composition root: every collaborator the commands use, built once per run.

use std::sync::Arc;

use duodude_storefront::Result;
use duodude_storefront::api::{
    ApiClient, CartClient, CatalogClient, OrdersClient, SlideClient, UserClient,
};
use duodude_storefront::auth::{AuthSession, AuthState};
use duodude_storefront::cart::{CartReconciler, LocalGuestStore};
use duodude_storefront::config::StorefrontConfig;
use duodude_storefront::storage::FileStore;
use tracing::debug;

/// The cart reconciler as wired for the CLI.
pub type Cart = CartReconciler<LocalGuestStore<FileStore>, CartClient>;

pub struct Context {
    pub session: AuthSession,
    pub cart: Cart,
    pub catalog: CatalogClient,
    pub orders: OrdersClient,
    pub users: UserClient,
    pub slides: SlideClient,
}

impl Context {
    /// Restore the saved session and wire the clients.
    ///
    /// Nothing is fetched here; the cart loads on first use.
    pub async fn new(config: StorefrontConfig) -> Result<Self> {
        let store = FileStore::new(&config.data_dir);
        debug!(data_dir = %store.dir().display(), "Using data directory");

        let session = AuthSession::restore(Arc::new(store.clone())).await;
        let api = ApiClient::new(&config.api)?;

        let cart = CartReconciler::new(
            LocalGuestStore::new(store),
            CartClient::new(api.clone()),
            session.subscribe(),
        );

        Ok(Self {
            session,
            cart,
            catalog: CatalogClient::new(api.clone(), config.catalog_cache_ttl),
            orders: OrdersClient::new(api.clone()),
            users: UserClient::new(api.clone()),
            slides: SlideClient::new(api),
        })
    }

    /// Who is signed in right now.
    pub fn auth(&self) -> AuthState {
        self.session.current()
    }
}
