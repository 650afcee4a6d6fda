//! Storefront backend REST clients.
//!
//! # Architecture
//!
//! - One shared [`ApiClient`] wraps `reqwest` and the backend base URL
//! - Typed clients per resource borrow it: [`CartClient`], [`CatalogClient`],
//!   [`OrdersClient`], [`UserClient`], [`SlideClient`]
//! - The backend is the source of truth; only catalog reads are cached
//!   (`moka`, configurable TTL)
//!
//! # Error mapping
//!
//! | Status      | Error                                  |
//! |-------------|----------------------------------------|
//! | 401, 403    | [`StorefrontError::Unauthorized`]      |
//! | 404         | [`StorefrontError::NotFound`]          |
//! | 429         | [`StorefrontError::RateLimited`]       |
//! | other non-2xx | [`StorefrontError::Api`]             |
//! | no response | [`StorefrontError::Transport`]         |

mod cache;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod slides;
pub mod users;

pub use cart::CartClient;
pub use catalog::{CatalogClient, ProductQuery};
pub use orders::OrdersClient;
pub use slides::SlideClient;
pub use users::{ProfileUpdate, UserClient};

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};
use url::Url;

use crate::auth::AuthToken;
use crate::config::ApiConfig;
use crate::error::{Result, StorefrontError};

/// Maximum characters of a response body echoed into logs and errors.
const BODY_EXCERPT_LEN: usize = 200;

// =============================================================================
// ApiClient
// =============================================================================

/// Shared HTTP client for the storefront backend.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("duodude-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an API path (without leading slash) against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| StorefrontError::BadRequest(format!("invalid API path {path:?}: {e}")))
    }

    fn request(&self, method: Method, url: Url, token: Option<&AuthToken>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Execute a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&AuthToken>,
    ) -> Result<T> {
        let response = self.send(self.request(Method::GET, url, token)).await?;
        decode(response).await
    }

    /// Execute a bodyless request and decode the JSON response.
    pub(crate) async fn send_for<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        token: Option<&AuthToken>,
    ) -> Result<T> {
        let response = self.send(self.request(method, url, token)).await?;
        decode(response).await
    }

    /// Execute a request with a JSON body and decode the JSON response.
    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        url: Url,
        token: Option<&AuthToken>,
        body: &B,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let response = self
            .send(self.request(method, url, token).json(body))
            .await?;
        decode(response).await
    }

    /// Execute a request with a JSON body, ignoring the response body.
    pub(crate) async fn send_json_ignored<B>(
        &self,
        method: Method,
        url: Url,
        token: Option<&AuthToken>,
        body: &B,
    ) -> Result<()>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(self.request(method, url, token).json(body))
            .await?;
        Ok(())
    }

    /// Execute a request whose response body is ignored.
    pub(crate) async fn send_empty(
        &self,
        method: Method,
        url: Url,
        token: Option<&AuthToken>,
    ) -> Result<()> {
        self.send(self.request(method, url, token)).await?;
        Ok(())
    }

    /// Send a request and map non-success statuses to errors.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(status = %status, url = %response.url(), "API request succeeded");
            return Ok(response);
        }

        Err(parse_error(response).await)
    }
}

/// Decode a successful response body as JSON.
///
/// The body is read as text first for better error diagnostics.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().clone();
    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|e| {
        error!(
            error = %e,
            url = %url,
            body = %excerpt(&body),
            "Failed to parse API response"
        );
        StorefrontError::Parse(format!("{url}: {e}"))
    })
}

/// Map an error response to a `StorefrontError`.
async fn parse_error(response: Response) -> StorefrontError {
    let status = response.status();

    // Check for rate limiting
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        return StorefrontError::RateLimited(retry_after);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            debug!(status = %status, url = %url, "API rejected credential");
            StorefrontError::Unauthorized(message)
        }
        StatusCode::NOT_FOUND => StorefrontError::NotFound(format!("{}: {message}", url.path())),
        _ => {
            error!(
                status = %status,
                url = %url,
                body = %excerpt(&body),
                "API returned non-success status"
            );
            StorefrontError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Extract the backend's `{ "message": ... }` error text, falling back to the raw body.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| {
            if body.trim().is_empty() {
                "(empty response body)".to_string()
            } else {
                excerpt(body)
            }
        },
        |parsed| parsed.message,
    )
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::new(base, Duration::from_secs(1)).unwrap()).unwrap()
    }

    #[test]
    fn test_url_resolves_beneath_prefix() {
        let api = client("https://shop.example/backend");
        assert_eq!(
            api.url("/api/cart").unwrap().as_str(),
            "https://shop.example/backend/api/cart"
        );
        assert_eq!(
            api.url("api/products/64f1").unwrap().as_str(),
            "https://shop.example/backend/api/products/64f1"
        );
    }

    #[test]
    fn test_error_message_prefers_backend_message() {
        assert_eq!(error_message(r#"{"message":"Token expired"}"#), "Token expired");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("  "), "(empty response body)");
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(BODY_EXCERPT_LEN * 2);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_LEN);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let api = client("http://127.0.0.1:9");
        let err = api
            .get::<serde_json::Value>(api.url("api/cart").unwrap(), None)
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
