//! Product catalog client.
//!
//! Catalog reads are public and change rarely, so responses are cached with
//! `moka` (TTL from `DUODUDE_CATALOG_CACHE_TTL_SECS`, 5 minutes by default).

use std::time::Duration;

use duodude_core::{Product, ProductId};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::ApiClient;
use super::cache::{CacheKey, CacheValue};
use crate::error::{Result, StorefrontError};

const PRODUCTS_PATH: &str = "api/products";
const FEATURED_PATH: &str = "api/featured-products";
const MAX_CACHED_ENTRIES: u64 = 1000;

/// Filters for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Sort field understood by the backend (e.g., `createdAt`).
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub category: Option<String>,
}

impl ProductQuery {
    /// The newest products first, as shown under "New Arrivals".
    #[must_use]
    pub fn new_arrivals(limit: u32) -> Self {
        Self {
            sort: Some("createdAt".to_string()),
            limit: Some(limit),
            category: None,
        }
    }

    /// Query-string pairs, skipping unset filters.
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        pairs
    }
}

/// Client for the product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api", &self.api)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

impl CatalogClient {
    /// Create a catalog client caching responses for `ttl`.
    #[must_use]
    pub fn new(api: ApiClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_ENTRIES)
            .time_to_live(ttl)
            .build();

        Self { api, cache }
    }

    /// List products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut url = self.api.url(PRODUCTS_PATH)?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let cache_key = CacheKey::Products(url.query().unwrap_or_default().to_string());
        if let Some(CacheValue::Products(products)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let response: ProductList = self.api.get(url, None).await?;
        let products = response.into_vec();

        self.cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Products flagged for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<Product>> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Featured).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let response: ProductList = self.api.get(self.api.url(FEATURED_PATH)?, None).await?;
        let products = response.into_vec();

        self.cache
            .insert(CacheKey::Featured, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the backend has no such product,
    /// or another error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        let cache_key = CacheKey::Product(id.as_str().to_string());
        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let mut url = self.api.url(PRODUCTS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::BadRequest("API base URL cannot hold a path".to_string()))?
            .push(id.as_str());

        let product: Product = self.api.get(url, None).await?;

        self.cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.cache
            .invalidate(&CacheKey::Product(id.as_str().to_string()))
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Product listings arrive either as a bare array or wrapped in `{ products }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductList {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl ProductList {
    fn into_vec(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Wrapped { products } => products,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_list_accepts_both_shapes() {
        let bare: ProductList = serde_json::from_str(r#"[{"_id": "a"}, {"_id": "b"}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 2);

        let wrapped: ProductList =
            serde_json::from_str(r#"{"products": [{"_id": "a", "name": "Tee"}]}"#).unwrap();
        let products = wrapped.into_vec();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Tee");
    }

    #[test]
    fn test_query_pairs_skip_unset_filters() {
        assert!(ProductQuery::default().pairs().is_empty());

        let query = ProductQuery {
            category: Some("hoodies".to_string()),
            ..ProductQuery::new_arrivals(8)
        };
        assert_eq!(
            query.pairs(),
            vec![
                ("sort", "createdAt".to_string()),
                ("limit", "8".to_string()),
                ("category", "hoodies".to_string()),
            ]
        );
    }
}
