//! Duodude Storefront library.
//!
//! Typed clients for the storefront backend, durable guest-cart storage,
//! and the [`cart::CartReconciler`] that keeps one authoritative cart in
//! sync with whichever store is authoritative for the current session.
//!
//! # Composition
//!
//! ```rust,ignore
//! let store = FileStore::new(&config.data_dir);
//! let session = AuthSession::restore(Arc::new(store.clone())).await;
//! let api = ApiClient::new(&config.api)?;
//!
//! let reconciler = CartReconciler::new(
//!     LocalGuestStore::new(store),
//!     CartClient::new(api.clone()),
//!     session.subscribe(),
//! );
//! reconciler.initialize().await?;
//! let _listener = reconciler.spawn_auth_listener();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod storage;

pub use error::{Result, StorefrontError};
