//! Catalog product types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A catalog product as served by the backend.
///
/// Only the identifier is mandatory; every other field defaults so that a
/// sparsely populated product (or one saved by an older client) still
/// deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Numeric id from the pre-document-store catalog.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    /// Price in US dollars.
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    /// Single image URL used by older catalog entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(rename = "new", default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl Product {
    /// A product known only by its identifier.
    #[must_use]
    pub fn reference(id: ProductId) -> Self {
        Self {
            id,
            legacy_id: None,
            name: String::new(),
            price: Decimal::ZERO,
            images: Vec::new(),
            image: None,
            description: String::new(),
            category: String::new(),
            sizes: Vec::new(),
            colors: Vec::new(),
            featured: false,
            is_new: false,
            rating: None,
            stock: None,
        }
    }

    /// First image to show for the product, falling back to the legacy field.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.image.as_deref())
    }

    /// Whether the product is offered in the given size.
    ///
    /// Products without a size list accept any (or no) size.
    #[must_use]
    pub fn offers_size(&self, size: Option<&str>) -> bool {
        match size {
            None => true,
            Some(_) if self.sizes.is_empty() => true,
            Some(size) => self.sizes.iter().any(|s| s == size),
        }
    }
}

/// A product reference that the backend may or may not have populated.
///
/// Cart and order payloads carry either the full product document or just
/// its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Populated(Box<Product>),
    Id(ProductId),
}

impl ProductRef {
    /// The referenced product's identifier.
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Populated(product) => &product.id,
            Self::Id(id) => id,
        }
    }

    /// Resolve into a product, using a bare reference when not populated.
    #[must_use]
    pub fn into_product(self) -> Product {
        match self {
            Self::Populated(product) => *product,
            Self::Id(id) => Product::reference(id),
        }
    }
}
