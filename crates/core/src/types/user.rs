//! Account profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkout::ShippingAddress;
use super::id::{AddressId, UserId};
use super::status::{AddressKind, UserRole};

/// The signed-in account's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub addresses: Vec<SavedAddress>,
}

impl User {
    /// Whether the account has back-office access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// The default saved address, shaped for checkout.
    #[must_use]
    pub fn default_shipping_address(&self) -> Option<ShippingAddress> {
        self.addresses
            .iter()
            .find(|address| address.is_default)
            .map(|address| ShippingAddress {
                name: self.name.clone(),
                street: address.street.clone(),
                city: address.city.clone(),
                zip: address.zip_code.clone(),
                country: address.country.clone(),
            })
    }
}

/// An address stored on the user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    /// Assigned by the backend; absent on addresses not yet saved.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl SavedAddress {
    /// Whether the fields a shipment needs are filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.zip_code, &self.country]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}
