//! The cart reconciler.
//!
//! One [`CartReconciler`] owns the in-memory cart for a session and decides
//! where it is sourced from:
//!
//! ```text
//! Uninitialized --(signed out)--> Loaded(Local)
//! Uninitialized --(signed in)---> Loaded(Remote)
//! Loaded(Local) --(sign in)-----> migrate guest lines --> Loaded(Remote)
//! Loaded(Remote) -(sign out)----> Loaded(Local)   (remote cart untouched)
//! Loaded(Remote) -(credential rejected)-> Loaded(Local)
//! ```
//!
//! Every operation runs under one async mutex, so a second call observes
//! the first one's result. Reconciliations also take a generation number;
//! a reconciliation overtaken by a newer trigger does not commit its result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use duodude_core::{CartSnapshot, LineKey, Product, Quantity};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{GuestStore, RemoteCart};
use crate::auth::{AuthState, AuthToken};
use crate::error::{self, Result, StorefrontError};

/// Buffered cart events per subscriber before the slowest one lags.
const EVENT_CAPACITY: usize = 32;

/// Which store the in-memory cart mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartSource {
    /// The device-local guest cart.
    Local,
    /// The backend cart of the signed-in user.
    Remote,
}

impl std::fmt::Display for CartSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Reconciler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loaded(CartSource),
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The cart was (re)loaded from the given source.
    Loaded(CartSource),
    /// Guest lines were moved into the remote cart, which is now loaded.
    Migrated { lines: usize },
    /// The credential was rejected; the guest cart is loaded instead.
    Degraded,
    /// A newer reconciliation was requested; this result was discarded.
    Superseded,
}

/// Notifications for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Loaded { source: CartSource, lines: usize },
    Migrated { lines: usize },
    Changed { lines: usize },
    /// The backend rejected the credential; the guest cart is in use.
    Degraded,
    /// A transient failure; the cart shown is unchanged.
    Failed { message: String },
}

#[derive(Debug, Default)]
struct CartState {
    phase: Phase,
    snapshot: CartSnapshot,
    /// Credential the remote cart was loaded with; `None` while local.
    credential: Option<AuthToken>,
    /// Credential the backend refused; never sent again.
    rejected: Option<AuthToken>,
}

impl CartState {
    fn load(&mut self, source: CartSource, snapshot: CartSnapshot, credential: Option<AuthToken>) {
        self.phase = Phase::Loaded(source);
        self.snapshot = snapshot;
        self.credential = credential;
    }

    fn is_rejected(&self, token: &AuthToken) -> bool {
        self.rejected.as_ref() == Some(token)
    }

    /// The credential for remote mutations, when the remote cart is loaded.
    fn remote_credential(&self) -> Option<AuthToken> {
        match self.phase {
            Phase::Loaded(CartSource::Remote) => self.credential.clone(),
            _ => None,
        }
    }
}

/// Keeps one authoritative cart in sync with the guest store or the
/// remote cart, following the authentication state.
///
/// Cheaply cloneable via `Arc`.
pub struct CartReconciler<G, R> {
    inner: Arc<ReconcilerInner<G, R>>,
}

struct ReconcilerInner<G, R> {
    guest: G,
    remote: R,
    auth: watch::Receiver<AuthState>,
    state: Mutex<CartState>,
    generation: AtomicU64,
    events: broadcast::Sender<CartEvent>,
}

/// Progress of a guest-to-remote migration, kept when it is interrupted.
#[derive(Debug, Default)]
struct Migration {
    /// Lines the backend accepted.
    moved: usize,
    /// Guest lines not yet accepted.
    remaining: CartSnapshot,
    /// Full remote cart returned by the last accepted add.
    cart: Option<CartSnapshot>,
}

impl<G, R> Clone for CartReconciler<G, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, R> std::fmt::Debug for CartReconciler<G, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartReconciler")
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<G: GuestStore, R: RemoteCart> CartReconciler<G, R> {
    /// Create a reconciler. Nothing is loaded until [`Self::initialize`] or
    /// the first operation.
    #[must_use]
    pub fn new(guest: G, remote: R, auth: watch::Receiver<AuthState>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ReconcilerInner {
                guest,
                remote,
                auth,
                state: Mutex::new(CartState::default()),
                generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Subscribe to cart events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.events.subscribe()
    }

    /// Number of reconciliations requested so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// The current lifecycle phase.
    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Load the cart for the current authentication state.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the remote cart cannot be reached.
    pub async fn initialize(&self) -> Result<Reconciliation> {
        self.reconcile().await
    }

    /// Bring the cart in line with the current authentication state.
    ///
    /// Signing in from a loaded guest cart migrates its lines first. A
    /// rejected credential degrades to the guest cart and is not an error.
    ///
    /// # Errors
    ///
    /// Returns transport and API errors; the cart is left as it was.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<Reconciliation> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.inner.state.lock().await;

        if !self.is_current(Some(generation)) {
            debug!(generation, "Reconciliation overtaken before it started");
            return Ok(Reconciliation::Superseded);
        }

        let auth = self.inner.auth.borrow().clone();
        self.reconcile_locked(&mut state, &auth, Some(generation))
            .await
    }

    /// The current cart, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the first load fails.
    pub async fn snapshot(&self) -> Result<CartSnapshot> {
        let mut state = self.inner.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        Ok(state.snapshot.clone())
    }

    /// Add units of a product, merging with an existing line of the same
    /// product and size.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be saved; the cart is unchanged.
    #[instrument(skip_all, fields(product_id = %product.id, quantity = %quantity))]
    pub async fn add_line(
        &self,
        product: Product,
        quantity: Quantity,
        size: Option<String>,
    ) -> Result<CartSnapshot> {
        let mut state = self.inner.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let product_id = product.id.clone();
        match state.remote_credential() {
            None => {
                let mut next = state.snapshot.clone();
                next.add(product, quantity, size);
                self.commit_local(&mut state, next).await?;
            }
            Some(token) => {
                // The add response is the full cart.
                match self
                    .inner
                    .remote
                    .add_line(&token, &product_id, quantity, size.as_deref())
                    .await
                {
                    Ok(next) => self.commit_remote(&mut state, next),
                    Err(e) => return Err(self.remote_failed(&mut state, e).await),
                }
            }
        }

        error::add_breadcrumb("cart", "Added line", Some(&[("product_id", product_id.as_str())]));
        Ok(state.snapshot.clone())
    }

    /// Remove a line. Removing a line that is not in the cart does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be saved.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn remove_line(&self, key: &LineKey) -> Result<CartSnapshot> {
        let mut state = self.inner.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        if state.snapshot.find(key).is_none() {
            debug!("Line not in cart");
            return Ok(state.snapshot.clone());
        }

        match state.remote_credential() {
            None => {
                let mut next = state.snapshot.clone();
                next.remove(key);
                self.commit_local(&mut state, next).await?;
            }
            Some(token) => {
                let siblings: Vec<_> = state
                    .snapshot
                    .lines_for(&key.product)
                    .filter(|line| !line.matches(key))
                    .map(|line| (line.quantity, line.size.clone()))
                    .collect();

                match self.remove_remote_line(&token, key, siblings).await {
                    Ok(next) => self.commit_remote(&mut state, next),
                    Err(e) => return Err(self.mutation_failed(&mut state, &token, e).await),
                }
            }
        }

        error::add_breadcrumb(
            "cart",
            "Removed line",
            Some(&[("product_id", key.product.as_str())]),
        );
        Ok(state.snapshot.clone())
    }

    /// Set a line's quantity. Requests below one store one; this never
    /// removes the line. Unknown lines are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be saved.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn set_quantity(&self, key: &LineKey, requested: i64) -> Result<CartSnapshot> {
        let quantity = Quantity::clamped(requested);

        let mut state = self.inner.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        if state.snapshot.find(key).is_none() {
            debug!("Line not in cart");
            return Ok(state.snapshot.clone());
        }

        match state.remote_credential() {
            None => {
                let mut next = state.snapshot.clone();
                next.set_quantity(key, quantity);
                self.commit_local(&mut state, next).await?;
            }
            Some(token) => match self.update_quantity(&token, key, quantity).await {
                Ok(next) => self.commit_remote(&mut state, next),
                Err(e) => return Err(self.mutation_failed(&mut state, &token, e).await),
            },
        }

        error::add_breadcrumb(
            "cart",
            "Set quantity",
            Some(&[("product_id", key.product.as_str())]),
        );
        Ok(state.snapshot.clone())
    }

    /// Empty the cart.
    ///
    /// The in-memory cart is emptied before the store is, and stays empty
    /// even if clearing the store fails.
    ///
    /// # Errors
    ///
    /// Returns the store's error; a later reload shows what it still holds.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        state.snapshot.clear();
        self.emit(CartEvent::Changed { lines: 0 });
        error::add_breadcrumb("cart", "Cleared cart", None);

        match state.remote_credential() {
            None => self.inner.guest.clear().await,
            Some(token) => match self.inner.remote.clear(&token).await {
                Ok(()) => Ok(()),
                Err(e) => Err(self.remote_failed(&mut state, e).await),
            },
        }
    }

    /// Reconcile on every authentication change until the auth channel closes.
    #[must_use = "dropping the handle detaches the listener"]
    pub fn spawn_auth_listener(&self) -> JoinHandle<()>
    where
        G: 'static,
        R: 'static,
    {
        let reconciler = self.clone();
        let mut auth = self.inner.auth.clone();

        tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                match reconciler.reconcile().await {
                    Ok(outcome) => debug!(?outcome, "Reconciled after auth change"),
                    Err(e) => warn!(error = %e, "Reconciliation after auth change failed"),
                }
            }
            debug!("Auth channel closed, cart listener stopping");
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn is_current(&self, generation: Option<u64>) -> bool {
        generation.is_none_or(|g| self.inner.generation.load(Ordering::SeqCst) == g)
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Load on first use. Lazy loads are never superseded.
    async fn ensure_loaded(&self, state: &mut CartState) -> Result<()> {
        if state.phase == Phase::Uninitialized {
            let auth = self.inner.auth.borrow().clone();
            self.reconcile_locked(state, &auth, None).await?;
        }
        Ok(())
    }

    async fn reconcile_locked(
        &self,
        state: &mut CartState,
        auth: &AuthState,
        generation: Option<u64>,
    ) -> Result<Reconciliation> {
        let Some(token) = auth.credential().cloned() else {
            let snapshot = self.inner.guest.load().await;
            if !self.is_current(generation) {
                return Ok(Reconciliation::Superseded);
            }
            info!(lines = snapshot.len(), "Loaded guest cart");
            self.emit(CartEvent::Loaded {
                source: CartSource::Local,
                lines: snapshot.len(),
            });
            state.load(CartSource::Local, snapshot, None);
            state.rejected = None;
            return Ok(Reconciliation::Loaded(CartSource::Local));
        };

        if state.is_rejected(&token) {
            return self.stay_degraded(state, generation).await;
        }

        let mut migration = None;
        if state.phase == Phase::Loaded(CartSource::Local) {
            let mut progress = Migration::default();
            let outcome = self.migrate(&token, &mut progress).await;
            if progress.moved > 0 {
                // Accepted lines must not remain in the guest cart.
                state.snapshot = progress.remaining.clone();
            }
            if let Err(e) = outcome {
                return self.reconcile_failed(state, &token, e, generation).await;
            }
            migration = Some(progress);
        }

        let snapshot = match self.inner.remote.fetch(&token).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if !e.is_authorization() && self.is_current(generation) {
                    // The last accepted add already returned the full remote cart.
                    if let Some(cart) = migration.and_then(|m| m.cart) {
                        state.load(CartSource::Remote, cart, Some(token.clone()));
                    }
                }
                return self.reconcile_failed(state, &token, e, generation).await;
            }
        };

        if !self.is_current(generation) {
            debug!(?generation, "Discarding superseded remote cart");
            return Ok(Reconciliation::Superseded);
        }

        state.load(CartSource::Remote, snapshot, Some(token));
        state.rejected = None;
        let lines = state.snapshot.len();

        if let Some(migration) = migration {
            let migrated = migration.moved;
            info!(migrated, lines, "Migrated guest cart");
            self.emit(CartEvent::Migrated { lines: migrated });
            Ok(Reconciliation::Migrated { lines: migrated })
        } else {
            info!(lines, "Loaded remote cart");
            self.emit(CartEvent::Loaded {
                source: CartSource::Remote,
                lines,
            });
            Ok(Reconciliation::Loaded(CartSource::Remote))
        }
    }

    /// Keep using the guest cart while the refused credential is current.
    async fn stay_degraded(
        &self,
        state: &mut CartState,
        generation: Option<u64>,
    ) -> Result<Reconciliation> {
        let snapshot = self.inner.guest.load().await;
        if !self.is_current(generation) {
            return Ok(Reconciliation::Superseded);
        }
        debug!("Credential was refused before, not sending it again");
        state.load(CartSource::Local, snapshot, None);
        Ok(Reconciliation::Degraded)
    }

    /// Move every guest line into the remote cart, then forget the guest cart.
    ///
    /// Each line is dropped from the saved guest cart as soon as the backend
    /// accepts it, so an interrupted migration never adds a line twice.
    /// `progress` records what was accepted even when an error is returned.
    async fn migrate(&self, token: &AuthToken, progress: &mut Migration) -> Result<()> {
        progress.remaining = self.inner.guest.load().await;
        let lines = progress.remaining.lines().to_vec();

        for line in &lines {
            let cart = self
                .inner
                .remote
                .add_line(token, &line.product.id, line.quantity, line.size.as_deref())
                .await?;

            progress.moved += 1;
            progress.cart = Some(cart);
            progress.remaining.remove(&line.key());
            if let Err(e) = self.inner.guest.save(&progress.remaining).await {
                warn!(error = %e, product_id = %line.product.id, "Failed to record migrated line");
            }
        }

        if let Err(e) = self.inner.guest.clear().await {
            warn!(error = %e, "Failed to clear guest cart after migration");
        }
        if progress.moved > 0 {
            error::add_breadcrumb("cart", "Migrated guest cart", None);
        }
        Ok(())
    }

    /// Handle a remote failure during reconciliation.
    async fn reconcile_failed(
        &self,
        state: &mut CartState,
        token: &AuthToken,
        err: StorefrontError,
        generation: Option<u64>,
    ) -> Result<Reconciliation> {
        if !err.is_authorization() {
            warn!(error = %err, "Cart reconciliation failed");
            self.emit(CartEvent::Failed {
                message: err.to_string(),
            });
            return Err(err);
        }

        let snapshot = self.inner.guest.load().await;
        if !self.is_current(generation) {
            return Ok(Reconciliation::Superseded);
        }
        self.degrade(state, snapshot, token.clone(), &err);
        Ok(Reconciliation::Degraded)
    }

    /// Handle a remote failure during a cart operation; the error is handed back.
    async fn remote_failed(&self, state: &mut CartState, err: StorefrontError) -> StorefrontError {
        if err.is_authorization() {
            let snapshot = self.inner.guest.load().await;
            if let Some(rejected) = state.credential.clone() {
                self.degrade(state, snapshot, rejected, &err);
            } else {
                state.load(CartSource::Local, snapshot, None);
            }
        } else {
            warn!(error = %err, "Remote cart operation failed");
            self.emit(CartEvent::Failed {
                message: err.to_string(),
            });
        }
        err
    }

    /// Handle a failed remote change that may have partly applied.
    ///
    /// The cart is refreshed so memory shows what the backend holds.
    async fn mutation_failed(
        &self,
        state: &mut CartState,
        token: &AuthToken,
        err: StorefrontError,
    ) -> StorefrontError {
        if !err.is_authorization() {
            match self.inner.remote.fetch(token).await {
                Ok(server) => state.snapshot = server,
                Err(e) => warn!(error = %e, "Failed to refresh cart after a failed change"),
            }
        }
        self.remote_failed(state, err).await
    }

    fn degrade(
        &self,
        state: &mut CartState,
        snapshot: CartSnapshot,
        rejected: AuthToken,
        err: &StorefrontError,
    ) {
        warn!(error = %err, "Credential rejected, using guest cart");
        error::add_breadcrumb("cart", "Fell back to guest cart", None);
        state.load(CartSource::Local, snapshot, None);
        state.rejected = Some(rejected);
        self.emit(CartEvent::Degraded);
    }

    /// Set one remote line's quantity, then refresh.
    async fn update_quantity(
        &self,
        token: &AuthToken,
        key: &LineKey,
        quantity: Quantity,
    ) -> Result<CartSnapshot> {
        let remote = &self.inner.remote;
        remote
            .set_quantity(token, &key.product, quantity, key.size.as_deref())
            .await?;
        remote.fetch(token).await
    }

    /// Remove one remote line, then refresh.
    ///
    /// The backend drops every size of the product, so `siblings` are added
    /// back afterwards.
    async fn remove_remote_line(
        &self,
        token: &AuthToken,
        key: &LineKey,
        siblings: Vec<(Quantity, Option<String>)>,
    ) -> Result<CartSnapshot> {
        let remote = &self.inner.remote;
        remote.remove_line(token, &key.product).await?;
        for (quantity, size) in siblings {
            remote
                .add_line(token, &key.product, quantity, size.as_deref())
                .await?;
        }
        remote.fetch(token).await
    }

    async fn commit_local(&self, state: &mut CartState, next: CartSnapshot) -> Result<()> {
        self.inner.guest.save(&next).await?;
        state.snapshot = next;
        self.emit(CartEvent::Changed {
            lines: state.snapshot.len(),
        });
        Ok(())
    }

    fn commit_remote(&self, state: &mut CartState, next: CartSnapshot) {
        state.snapshot = next;
        self.emit(CartEvent::Changed {
            lines: state.snapshot.len(),
        });
    }
}
