//! User profile client.
//!
//! # Endpoints
//!
//! - `GET /api/users/me` - the signed-in profile
//! - `PUT /api/users/me` - update name, email and optionally password
//! - `POST /api/users/me/addresses` - add a saved address
//! - `PUT /api/users/me/addresses/{id}` - replace a saved address
//! - `DELETE /api/users/me/addresses/{id}` - remove a saved address
//! - `GET /api/users` - every account (admin role)
//!
//! Profile and address writes answer with the updated profile.

use duodude_core::{AddressId, SavedAddress, User};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

use super::ApiClient;
use crate::auth::AuthToken;
use crate::error::{self, Result, StorefrontError};

const ME_PATH: &str = "api/users/me";
const USERS_PATH: &str = "api/users";

/// Changes to the signed-in profile.
///
/// The password is only sent when set.
#[derive(Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Client for the signed-in user's profile.
#[derive(Debug, Clone)]
pub struct UserClient {
    api: ApiClient,
}

impl UserClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch the profile the credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthorized` if the credential is rejected.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &AuthToken) -> Result<User> {
        self.api.get(self.api.url(ME_PATH)?, Some(token)).await
    }

    /// Update name and email, and the password when one is given.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::BadRequest` for a blank name or email
    /// without contacting the backend.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, token: &AuthToken, update: &ProfileUpdate) -> Result<User> {
        if update.name.trim().is_empty() || update.email.trim().is_empty() {
            return Err(StorefrontError::BadRequest(
                "name and email are required".to_string(),
            ));
        }

        let body = ProfileUpdateRequest {
            name: &update.name,
            email: &update.email,
            password: update.password.as_ref().map(ExposeSecret::expose_secret),
        };
        let user: User = self
            .api
            .send_json(Method::PUT, self.api.url(ME_PATH)?, Some(token), &body)
            .await?;

        info!(user_id = %user.id, password_changed = body.password.is_some(), "Profile updated");
        error::add_breadcrumb("account", "Updated profile", None);
        Ok(user)
    }

    /// Save a new address on the profile.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::BadRequest` for an incomplete address.
    #[instrument(skip_all, fields(kind = %address.kind))]
    pub async fn add_address(&self, token: &AuthToken, address: &SavedAddress) -> Result<User> {
        let body = address_body(address)?;
        let user: User = self
            .api
            .send_json(Method::POST, self.addresses_url(None)?, Some(token), &body)
            .await?;

        info!(addresses = user.addresses.len(), "Address added");
        Ok(user)
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the profile has no such address.
    #[instrument(skip_all, fields(address_id = %id))]
    pub async fn update_address(
        &self,
        token: &AuthToken,
        id: &AddressId,
        address: &SavedAddress,
    ) -> Result<User> {
        let body = address_body(address)?;
        let user: User = self
            .api
            .send_json(Method::PUT, self.addresses_url(Some(id))?, Some(token), &body)
            .await?;

        info!("Address updated");
        Ok(user)
    }

    /// Remove a saved address.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the profile has no such address.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn delete_address(&self, token: &AuthToken, id: &AddressId) -> Result<User> {
        let url = self.addresses_url(Some(id))?;
        let user: User = self
            .api
            .send_for(Method::DELETE, url, Some(token))
            .await?;

        info!(addresses = user.addresses.len(), "Address deleted");
        Ok(user)
    }

    /// Every account in the store. Requires the admin role.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthorized` for non-admin credentials.
    #[instrument(skip(self, token))]
    pub async fn all_users(&self, token: &AuthToken) -> Result<Vec<User>> {
        self.api.get(self.api.url(USERS_PATH)?, Some(token)).await
    }

    fn addresses_url(&self, id: Option<&AddressId>) -> Result<Url> {
        let mut url = self.api.url(ME_PATH)?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StorefrontError::BadRequest("API base URL cannot hold a path".to_string())
            })?;
            segments.push("addresses");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct ProfileUpdateRequest<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

/// The address as a request body; the backend assigns `_id`.
fn address_body(address: &SavedAddress) -> Result<SavedAddress> {
    if !address.is_complete() {
        return Err(StorefrontError::BadRequest(
            "address needs street, city, zip code and country".to_string(),
        ));
    }
    Ok(SavedAddress {
        id: None,
        ..address.clone()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use duodude_core::AddressKind;

    use super::*;
    use crate::config::ApiConfig;

    fn client() -> UserClient {
        // Nothing listens on port 9; reaching the network would be a transport error.
        let api = ApiClient::new(
            &ApiConfig::new("http://127.0.0.1:9/shop", Duration::from_secs(1)).unwrap(),
        )
        .unwrap();
        UserClient::new(api)
    }

    #[test]
    fn test_profile_update_omits_empty_password() {
        let body = ProfileUpdateRequest {
            name: "Asha",
            email: "asha@example.com",
            password: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"name": "Asha", "email": "asha@example.com"})
        );
    }

    #[test]
    fn test_profile_update_debug_redacts_password() {
        let update = ProfileUpdate {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: Some(SecretString::from("hunter22")),
        };
        let debug = format!("{update:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_addresses_url() {
        let users = client();
        assert_eq!(
            users.addresses_url(None).unwrap().as_str(),
            "http://127.0.0.1:9/shop/api/users/me/addresses"
        );
        assert_eq!(
            users
                .addresses_url(Some(&AddressId::new("a1")))
                .unwrap()
                .as_str(),
            "http://127.0.0.1:9/shop/api/users/me/addresses/a1"
        );
    }

    #[test]
    fn test_address_body_drops_id() {
        let address = SavedAddress {
            id: Some(AddressId::new("a1")),
            kind: AddressKind::Work,
            street: "1 Main St".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            zip_code: "411001".to_string(),
            country: "IN".to_string(),
            is_default: true,
        };
        let body = address_body(&address).unwrap();
        assert_eq!(body.id, None);
        assert_eq!(body.kind, AddressKind::Work);

        let err = address_body(&SavedAddress::default()).unwrap_err();
        assert!(matches!(err, StorefrontError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_blank_profile_fields_rejected_locally() {
        let err = client()
            .update_profile(
                &AuthToken::new("t"),
                &ProfileUpdate {
                    name: " ".to_string(),
                    email: "asha@example.com".to_string(),
                    password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::BadRequest(_)));
    }
}
