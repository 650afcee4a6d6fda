//! Authentication session.
//!
//! [`AuthSession`] owns the signed-in user and bearer credential and
//! publishes every change through a `tokio::sync::watch` channel. The cart
//! reconciler only ever holds a receiver: it observes sign-in and sign-out,
//! it never changes them.
//!
//! The session is persisted under the `user` and `token` storage keys so a
//! restart resumes where the previous run left off.

use std::sync::Arc;

use duodude_core::User;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{self, Result};
use crate::storage::KeyValueStore;

/// Storage key for the signed-in user's profile.
pub const USER_KEY: &str = "user";

/// Storage key for the bearer credential.
pub const TOKEN_KEY: &str = "token";

/// Bearer credential issued by the backend.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Snapshot of who is signed in.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    user: Option<User>,
    credential: Option<AuthToken>,
}

impl AuthState {
    /// Nobody signed in.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            user: None,
            credential: None,
        }
    }

    /// A signed-in user with their credential.
    #[must_use]
    pub const fn authenticated(user: User, credential: AuthToken) -> Self {
        Self {
            user: Some(user),
            credential: Some(credential),
        }
    }

    /// Signed in means a known user and a credential to act on their behalf.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.credential.is_some()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The credential, only when fully authenticated.
    #[must_use]
    pub fn credential(&self) -> Option<&AuthToken> {
        self.credential.as_ref().filter(|_| self.user.is_some())
    }

    /// Where to land after signing in: admins go to the back office.
    #[must_use]
    pub fn redirect_path(&self) -> &'static str {
        match &self.user {
            Some(user) if user.is_admin() => "/admin",
            _ => "/",
        }
    }
}

/// The authentication collaborator: source of truth for [`AuthState`].
pub struct AuthSession {
    state: watch::Sender<AuthState>,
    store: Arc<dyn KeyValueStore>,
}

impl AuthSession {
    /// Create a signed-out session persisted to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(AuthState::guest());
        Self { state, store }
    }

    /// Restore the session saved by a previous run.
    ///
    /// Missing, unreadable, or malformed entries yield a signed-out session.
    #[instrument(skip(store))]
    pub async fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let session = Self::new(store);

        let user = match session.store.get(USER_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<User>(&raw)
                .inspect_err(|e| warn!(error = %e, "Discarding malformed saved user"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read saved user");
                None
            }
        };
        let token = match session.store.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.trim().is_empty()).map(AuthToken::new),
            Err(e) => {
                warn!(error = %e, "Failed to read saved token");
                None
            }
        };

        if let (Some(user), Some(token)) = (user, token) {
            info!(user_id = %user.id, "Restored saved session");
            error::set_sentry_user(&user.id, Some(&user.email));
            session
                .state
                .send_replace(AuthState::authenticated(user, token));
        }

        session
    }

    /// Subscribe to authentication changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The current authentication state.
    #[must_use]
    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Sign in, persisting the session before announcing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be saved; subscribers are not
    /// notified in that case.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn login(&self, user: User, token: AuthToken) -> Result<()> {
        self.store
            .set(USER_KEY, &serde_json::to_string(&user)?)
            .await?;
        self.store.set(TOKEN_KEY, token.expose()).await?;

        error::set_sentry_user(&user.id, Some(&user.email));
        error::add_breadcrumb("auth", "Signed in", None);
        info!("Signed in");

        self.state
            .send_replace(AuthState::authenticated(user, token));
        Ok(())
    }

    /// Replace the saved profile after it was edited, keeping the credential.
    ///
    /// Subscribers are not woken: the credential, and so the cart, is
    /// unchanged. Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be saved.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn refresh_user(&self, user: User) -> Result<()> {
        if !self.current().is_authenticated() {
            return Ok(());
        }
        self.store
            .set(USER_KEY, &serde_json::to_string(&user)?)
            .await?;

        self.state.send_if_modified(|state| {
            state.user = Some(user);
            false
        });
        Ok(())
    }

    /// Sign out and forget the saved session.
    ///
    /// Subscribers are notified even if the saved entries cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.state.send_replace(AuthState::guest());
        error::clear_sentry_user();
        error::add_breadcrumb("auth", "Signed out", None);
        info!("Signed out");

        let user = self.store.remove(USER_KEY).await;
        let token = self.store.remove(TOKEN_KEY).await;
        user.and(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use duodude_core::{UserId, UserRole};

    use super::*;
    use crate::storage::MemoryStore;

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new("u1"),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            role,
            created_at: None,
            addresses: Vec::new(),
        }
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AuthToken::new("super-secret-token");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_credential_requires_user() {
        let state = AuthState {
            user: None,
            credential: Some(AuthToken::new("t")),
        };
        assert!(!state.is_authenticated());
        assert!(state.credential().is_none());
    }

    #[test]
    fn test_redirect_path_by_role() {
        assert_eq!(AuthState::guest().redirect_path(), "/");
        let admin = AuthState::authenticated(user(UserRole::Admin), AuthToken::new("t"));
        assert_eq!(admin.redirect_path(), "/admin");
        let shopper = AuthState::authenticated(user(UserRole::User), AuthToken::new("t"));
        assert_eq!(shopper.redirect_path(), "/");
    }

    #[tokio::test]
    async fn test_login_persists_and_notifies() {
        let store = MemoryStore::new();
        let session = AuthSession::new(Arc::new(store.clone()));
        let mut rx = session.subscribe();

        session
            .login(user(UserRole::User), AuthToken::new("tok"))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("tok"));

        let restored = AuthSession::restore(Arc::new(store.clone())).await;
        let state = restored.current();
        assert!(state.is_authenticated());
        assert_eq!(state.credential().unwrap().expose(), "tok");
    }

    #[tokio::test]
    async fn test_refresh_user_keeps_credential_quietly() {
        let store = Arc::new(MemoryStore::new());
        let session = AuthSession::new(store.clone());
        session
            .login(user(UserRole::User), AuthToken::new("tok"))
            .await
            .unwrap();
        let rx = session.subscribe();

        let mut renamed = user(UserRole::User);
        renamed.name = "Asha K".to_string();
        session.refresh_user(renamed).await.unwrap();

        assert!(!rx.has_changed().unwrap());
        let current = session.current();
        assert_eq!(current.user().unwrap().name, "Asha K");
        assert_eq!(current.credential().unwrap().expose(), "tok");

        let restored = AuthSession::restore(store).await;
        assert_eq!(restored.current().user().unwrap().name, "Asha K");
    }

    #[tokio::test]
    async fn test_logout_clears_saved_session() {
        let store = MemoryStore::new();
        let session = AuthSession::new(Arc::new(store.clone()));
        session
            .login(user(UserRole::User), AuthToken::new("tok"))
            .await
            .unwrap();

        session.logout().await.unwrap();

        assert!(!session.current().is_authenticated());
        assert_eq!(store.get(USER_KEY).await.unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_ignores_malformed_user() {
        let store = MemoryStore::new();
        store.set(USER_KEY, "{not json").await.unwrap();
        store.set(TOKEN_KEY, "tok").await.unwrap();

        let session = AuthSession::restore(Arc::new(store)).await;
        assert!(!session.current().is_authenticated());
    }
}
