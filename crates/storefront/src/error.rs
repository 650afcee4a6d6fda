//! Unified error handling with Sentry integration.
//!
//! Every client and the cart reconciler return `Result<T, StorefrontError>`.
//! The reconciler uses [`StorefrontError::is_authorization`] and
//! [`StorefrontError::is_transport`] to choose between degrading to the
//! guest cart and keeping the current cart untouched.

use thiserror::Error;

/// Error type for the storefront client library.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Network unreachable, connection reset, or timed out.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the credential (expired, invalid, or missing).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend's response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request was rejected before reaching the backend.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl StorefrontError {
    /// Whether the failure was caused by an invalid or expired credential.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the failure is transient and worth retrying later.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited(_))
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for cart and session actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added line", Some(&[("product_id", "64f1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::NotFound("product 64f1".to_string());
        assert_eq!(err.to_string(), "Not found: product 64f1");

        let err = StorefrontError::Api {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - maintenance");
    }

    #[test]
    fn test_error_classification() {
        assert!(StorefrontError::Unauthorized("expired".to_string()).is_authorization());
        assert!(!StorefrontError::Unauthorized("expired".to_string()).is_transport());
        assert!(StorefrontError::RateLimited(5).is_transport());
        assert!(!StorefrontError::NotFound("x".to_string()).is_authorization());
    }

    #[test]
    fn test_breadcrumb_without_client_is_noop() {
        // No Sentry client is bound in tests; recording must not panic.
        add_breadcrumb("cart", "Cleared cart", Some(&[("source", "local")]));
        clear_sentry_user();
    }
}
