//! End-to-end cart reconciliation against the mock backend.
//!
//! Each test wires the production stack (file-backed guest cart, HTTP cart
//! client, persisted auth session) to a fresh [`MockBackend`].

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use duodude_core::{CartSnapshot, LineKey, Product, ProductId, Quantity};
use duodude_integration_tests::{MockBackend, SHOPPER_TOKEN, StoredLine, shopper};
use duodude_storefront::api::{ApiClient, CartClient, CatalogClient};
use duodude_storefront::auth::{AuthSession, AuthToken};
use duodude_storefront::cart::{
    CartEvent, CartReconciler, CartSource, GuestStore, LocalGuestStore, Phase, Reconciliation,
};
use duodude_storefront::config::ApiConfig;
use duodude_storefront::storage::FileStore;
use tempfile::TempDir;

type Cart = CartReconciler<LocalGuestStore<FileStore>, CartClient>;

/// One device talking to the backend.
struct Device {
    _dir: TempDir,
    guest: LocalGuestStore<FileStore>,
    session: AuthSession,
    cart: Cart,
    catalog: CatalogClient,
}

impl Device {
    async fn new(backend: &MockBackend) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let session = AuthSession::restore(Arc::new(store.clone())).await;
        let api = backend.api();
        let cart = CartReconciler::new(
            LocalGuestStore::new(store.clone()),
            CartClient::new(api.clone()),
            session.subscribe(),
        );

        Self {
            _dir: dir,
            guest: LocalGuestStore::new(store),
            session,
            cart,
            catalog: CatalogClient::new(api, Duration::from_secs(300)),
        }
    }

    async fn product(&self, id: &str) -> Product {
        self.catalog.get_product(&ProductId::new(id)).await.unwrap()
    }

    async fn add(&self, id: &str, quantity: u32, size: Option<&str>) -> CartSnapshot {
        self.cart
            .add_line(
                self.product(id).await,
                Quantity::new(quantity).unwrap(),
                size.map(String::from),
            )
            .await
            .unwrap()
    }

    async fn sign_in(&self) -> Reconciliation {
        self.session
            .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
            .await
            .unwrap();
        self.cart.reconcile().await.unwrap()
    }
}

fn key(id: &str, size: Option<&str>) -> LineKey {
    LineKey::new(ProductId::new(id), size.map(String::from))
}

fn quantity_of(cart: &CartSnapshot, id: &str, size: Option<&str>) -> Option<u32> {
    cart.find(&key(id, size)).map(|line| line.quantity.get())
}

// =============================================================================
// Guest Cart
// =============================================================================

#[tokio::test]
async fn test_guest_add_sums_quantities_and_persists() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;

    device.add("tee", 1, Some("M")).await;
    let cart = device.add("tee", 2, Some("M")).await;

    assert_eq!(cart.len(), 1);
    assert_eq!(quantity_of(&cart, "tee", Some("M")), Some(3));
    assert_eq!(quantity_of(&device.guest.load().await, "tee", Some("M")), Some(3));
    assert_eq!(backend.request_count("POST /api/cart"), 0);
}

#[tokio::test]
async fn test_guest_remove_and_set_quantity() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.add("tee", 2, Some("M")).await;
    device.add("cap", 1, None).await;

    // Missing key is a no-op
    let cart = device.cart.remove_line(&key("tee", Some("L"))).await.unwrap();
    assert_eq!(cart.len(), 2);

    let cart = device.cart.set_quantity(&key("tee", Some("M")), 0).await.unwrap();
    assert_eq!(quantity_of(&cart, "tee", Some("M")), Some(1));

    let cart = device.cart.remove_line(&key("cap", None)).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(device.guest.load().await, cart);
}

// =============================================================================
// Migration
// =============================================================================

#[tokio::test]
async fn test_sign_in_migrates_into_empty_remote_cart() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("tee", 2, Some("M")).await;

    let outcome = device.sign_in().await;

    assert_eq!(outcome, Reconciliation::Migrated { lines: 1 });
    assert_eq!(
        backend.cart_of(&shopper()),
        vec![StoredLine::new("tee", 2, Some("M"))]
    );
    assert!(device.guest.load().await.is_empty());

    let cart = device.cart.snapshot().await.unwrap();
    assert_eq!(quantity_of(&cart, "tee", Some("M")), Some(2));
    // The remote cart comes back with populated products
    assert_eq!(cart.lines()[0].product.name, "Classic Tee");
}

#[tokio::test]
async fn test_sign_in_merges_with_existing_remote_cart() {
    let backend = MockBackend::start().await;
    backend.seed_cart(&shopper(), StoredLine::new("cap", 3, None));
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("cap", 1, None).await;

    device.sign_in().await;

    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("cap", 4, None)]);
    assert_eq!(
        quantity_of(&device.cart.snapshot().await.unwrap(), "cap", None),
        Some(4)
    );
    assert!(device.guest.load().await.is_empty());
}

#[tokio::test]
async fn test_repeated_sign_in_does_not_migrate_twice() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("hoodie", 1, Some("L")).await;

    device.sign_in().await;
    assert_eq!(backend.request_count("POST /api/cart"), 1);

    device.session.logout().await.unwrap();
    device.cart.reconcile().await.unwrap();
    assert_eq!(
        device.sign_in().await,
        Reconciliation::Migrated { lines: 0 }
    );

    assert_eq!(backend.request_count("POST /api/cart"), 1);
    assert_eq!(
        backend.cart_of(&shopper()),
        vec![StoredLine::new("hoodie", 1, Some("L"))]
    );
}

#[tokio::test]
async fn test_auth_listener_migrates_on_login() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("cap", 2, None).await;

    let mut events = device.cart.subscribe();
    let listener = device.cart.spawn_auth_listener();
    device
        .session
        .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, CartEvent::Migrated { lines: 1 });
    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("cap", 2, None)]);

    listener.abort();
}

// =============================================================================
// Signed-in Cart
// =============================================================================

#[tokio::test]
async fn test_signed_in_operations_go_to_backend() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.sign_in().await;

    device.add("tee", 1, Some("M")).await;
    device.add("tee", 2, Some("L")).await;
    let cart = device.add("tee", 1, Some("M")).await;
    assert_eq!(quantity_of(&cart, "tee", Some("M")), Some(2));

    // Removing one size keeps the other
    let cart = device.cart.remove_line(&key("tee", Some("M"))).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("tee", 2, Some("L"))]);

    // Three adds plus the re-add of the surviving size
    assert_eq!(backend.request_count("POST /api/cart"), 4);

    let cart = device.cart.set_quantity(&key("tee", Some("L")), -4).await.unwrap();
    assert_eq!(quantity_of(&cart, "tee", Some("L")), Some(1));
    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("tee", 1, Some("L"))]);
    assert_eq!(backend.request_count("POST /api/cart/tee/quantity"), 1);
    assert_eq!(backend.request_count("POST /api/cart"), 4);

    assert!(device.guest.load().await.is_empty());
}

#[tokio::test]
async fn test_failed_remote_clear_keeps_memory_empty() {
    let backend = MockBackend::start().await;
    backend.seed_cart(&shopper(), StoredLine::new("hoodie", 2, Some("M")));
    let device = Device::new(&backend).await;
    device.sign_in().await;
    backend.set_fail_clear(true);

    let err = device.cart.clear().await.unwrap_err();
    assert!(!err.is_authorization());
    assert!(device.cart.snapshot().await.unwrap().is_empty());

    // A later fetch shows what the server still holds
    device.cart.reconcile().await.unwrap();
    assert_eq!(
        quantity_of(&device.cart.snapshot().await.unwrap(), "hoodie", Some("M")),
        Some(2)
    );
}

#[tokio::test]
async fn test_failed_re_add_shows_what_the_server_kept() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.sign_in().await;
    device.add("tee", 1, Some("M")).await;
    device.add("tee", 2, Some("L")).await;
    device.add("cap", 1, None).await;
    backend.set_fail_adds(true);

    // The backend drops every size of the tee, then refuses the L re-add
    let err = device
        .cart
        .remove_line(&key("tee", Some("M")))
        .await
        .unwrap_err();
    assert!(!err.is_authorization());

    let cart = device.cart.snapshot().await.unwrap();
    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("cap", 1, None)]);
    assert_eq!(cart.len(), 1);
    assert_eq!(quantity_of(&cart, "cap", None), Some(1));
    assert_eq!(quantity_of(&cart, "tee", Some("L")), None);
}

#[tokio::test]
async fn test_sign_out_keeps_remote_cart() {
    let backend = MockBackend::start().await;
    backend.seed_cart(&shopper(), StoredLine::new("cap", 1, None));
    let device = Device::new(&backend).await;
    device.sign_in().await;

    device.session.logout().await.unwrap();
    assert_eq!(
        device.cart.reconcile().await.unwrap(),
        Reconciliation::Loaded(CartSource::Local)
    );

    assert!(device.cart.snapshot().await.unwrap().is_empty());
    assert_eq!(backend.cart_of(&shopper()), vec![StoredLine::new("cap", 1, None)]);
    assert_eq!(backend.request_count("DELETE /api/cart"), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_expired_credential_falls_back_to_guest_cart() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device
        .session
        .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
        .await
        .unwrap();
    backend.revoke(SHOPPER_TOKEN);

    assert_eq!(
        device.cart.initialize().await.unwrap(),
        Reconciliation::Degraded
    );
    assert_eq!(device.cart.phase().await, Phase::Loaded(CartSource::Local));

    device.add("cap", 1, None).await;
    assert_eq!(quantity_of(&device.guest.load().await, "cap", None), Some(1));
    assert_eq!(backend.request_count("POST /api/cart"), 0);
}

#[tokio::test]
async fn test_unreachable_backend_leaves_cart_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let session = AuthSession::new(Arc::new(store.clone()));
    session
        .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
        .await
        .unwrap();

    // Nothing listens on the discard port
    let api = ApiClient::new(&ApiConfig::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap())
        .unwrap();
    let cart = CartReconciler::new(
        LocalGuestStore::new(store),
        CartClient::new(api),
        session.subscribe(),
    );
    let mut events = cart.subscribe();

    let err = cart.initialize().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(cart.phase().await, Phase::Uninitialized);
    assert!(matches!(events.recv().await.unwrap(), CartEvent::Failed { .. }));
}

#[tokio::test]
async fn test_session_and_guest_cart_survive_restart() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let store = FileStore::new(dir.path());
        let session = AuthSession::restore(Arc::new(store.clone())).await;
        let cart = CartReconciler::new(
            LocalGuestStore::new(store),
            CartClient::new(backend.api()),
            session.subscribe(),
        );
        cart.add_line(
            Product::reference(ProductId::new("cap")),
            Quantity::new(2).unwrap(),
            None,
        )
        .await
        .unwrap();
    }

    let store = FileStore::new(dir.path());
    let session = AuthSession::restore(Arc::new(store.clone())).await;
    assert!(!session.current().is_authenticated());
    let cart = CartReconciler::new(
        LocalGuestStore::new(store),
        CartClient::new(backend.api()),
        session.subscribe(),
    );
    assert_eq!(
        quantity_of(&cart.snapshot().await.unwrap(), "cap", None),
        Some(2)
    );
}

#[tokio::test]
async fn test_refresh_failure_after_migration_never_migrates_twice() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("tee", 2, Some("M")).await;
    backend.set_fail_cart_reads(true);

    device
        .session
        .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
        .await
        .unwrap();
    let err = device.cart.reconcile().await.unwrap_err();
    assert!(!err.is_authorization());

    // The migrated line now lives on the backend only
    assert_eq!(device.cart.phase().await, Phase::Loaded(CartSource::Remote));
    assert!(device.guest.load().await.is_empty());

    let cart = device.add("cap", 1, None).await;
    assert_eq!(quantity_of(&cart, "tee", Some("M")), Some(2));
    backend.set_fail_cart_reads(false);

    device.session.logout().await.unwrap();
    device.cart.reconcile().await.unwrap();
    assert_eq!(
        device.sign_in().await,
        Reconciliation::Migrated { lines: 0 }
    );

    assert_eq!(
        backend.cart_of(&shopper()),
        vec![
            StoredLine::new("tee", 2, Some("M")),
            StoredLine::new("cap", 1, None)
        ]
    );
}

#[tokio::test]
async fn test_interrupted_migration_resumes_with_remaining_lines() {
    let backend = MockBackend::start().await;
    let device = Device::new(&backend).await;
    device.cart.initialize().await.unwrap();
    device.add("tee", 1, Some("S")).await;
    device.add("hoodie", 1, Some("L")).await;

    // Only the first line gets through
    backend.fail_adds_after(Some(1));
    device
        .session
        .login(shopper(), AuthToken::new(SHOPPER_TOKEN))
        .await
        .unwrap();
    device.cart.reconcile().await.unwrap_err();

    let cart = device.cart.snapshot().await.unwrap();
    assert_eq!(quantity_of(&cart, "tee", Some("S")), None);
    assert_eq!(quantity_of(&cart, "hoodie", Some("L")), Some(1));
    assert_eq!(device.guest.load().await.len(), 1);

    backend.fail_adds_after(None);
    assert_eq!(
        device.cart.reconcile().await.unwrap(),
        Reconciliation::Migrated { lines: 1 }
    );

    assert_eq!(
        backend.cart_of(&shopper()),
        vec![
            StoredLine::new("tee", 1, Some("S")),
            StoredLine::new("hoodie", 1, Some("L"))
        ]
    );
    assert!(device.guest.load().await.is_empty());
}
