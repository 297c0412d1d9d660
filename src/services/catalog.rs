//! Catalog reads with read-through caching
//!
//! Products, categories and criteria change rarely, so responses are kept in
//! the offline store's cache collection for the configured TTL. An expired
//! entry is simply absent: when the server is unreachable and the entry has
//! expired, the read fails.

use crate::error::Result;
use crate::services::api::RemoteApi;
use crate::storage::OfflineStore;
use crate::types::{Category, Criterion, EvaluationRecord, Product};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PRODUCTS_KEY: &str = "catalog:products";
const CATEGORIES_KEY: &str = "catalog:categories";
const CRITERIA_KEY: &str = "catalog:criteria";

/// Cached access to the remote catalog
pub struct CatalogService {
    api: Arc<dyn RemoteApi>,
    store: Arc<dyn OfflineStore>,
    ttl: Duration,
}

impl CatalogService {
    pub fn new(api: Arc<dyn RemoteApi>, store: Arc<dyn OfflineStore>, ttl: Duration) -> Self {
        Self { api, store, ttl }
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.cached_get(PRODUCTS_KEY, "/api/products").await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.cached_get(CATEGORIES_KEY, "/api/categories").await
    }

    /// All criteria, ordered as the server returns them
    pub async fn criteria(&self) -> Result<Vec<Criterion>> {
        self.cached_get(CRITERIA_KEY, "/api/criteria").await
    }

    /// Criteria scored for products of one category
    pub async fn criteria_for_category(&self, category_id: i64) -> Result<Vec<Criterion>> {
        Ok(self
            .criteria()
            .await?
            .into_iter()
            .filter(|c| c.category_id == category_id)
            .collect())
    }

    /// Submitted evaluations, always read fresh for reporting
    pub async fn evaluations(&self) -> Result<Vec<EvaluationRecord>> {
        let payload = self.api.get_json("/api/evaluations").await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn cached_get<T: DeserializeOwned>(&self, key: &str, path: &str) -> Result<T> {
        match self.store.get_cache(key).await {
            Ok(Some(payload)) => match serde_json::from_value(payload) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    return Ok(value);
                }
                Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
            },
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let payload = self.api.get_json(path).await?;
        let value = serde_json::from_value(payload.clone())?;

        if let Err(e) = self.store.put_cache(key, payload, self.ttl).await {
            warn!("Failed to cache {}: {}", key, e);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalSyncError;
    use crate::services::api::MockRemoteApi;
    use crate::storage::InMemoryOfflineStore;
    use serde_json::json;

    fn criteria_payload() -> serde_json::Value {
        json!([
            {"id": 1, "category_id": 2, "name": "Finish", "weight": 2.0, "max_score": 5},
            {"id": 2, "category_id": 3, "name": "Fit", "max_score": 5}
        ])
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let mut api = MockRemoteApi::new();
        api.expect_get_json()
            .withf(|path| path.ends_with("/api/criteria"))
            .times(1)
            .returning(|_| Ok(criteria_payload()));

        let store = Arc::new(InMemoryOfflineStore::new());
        let catalog = CatalogService::new(Arc::new(api), store, Duration::from_secs(60));

        assert_eq!(catalog.criteria().await.unwrap().len(), 2);
        let for_category = catalog.criteria_for_category(2).await.unwrap();
        assert_eq!(for_category.len(), 1);
        assert_eq!(for_category[0].name, "Finish");
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let mut api = MockRemoteApi::new();
        api.expect_get_json()
            .times(2)
            .returning(|_| Ok(json!([{"id": 1, "name": "Tools"}])));

        let store = Arc::new(InMemoryOfflineStore::new());
        let catalog = CatalogService::new(Arc::new(api), store, Duration::ZERO);

        catalog.categories().await.unwrap();
        catalog.categories().await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_miss_is_error() {
        let mut api = MockRemoteApi::new();
        api.expect_get_json()
            .returning(|_| Err(EvalSyncError::RemoteApi("unreachable".into())));

        let store = Arc::new(InMemoryOfflineStore::new());
        let catalog = CatalogService::new(Arc::new(api), store, Duration::from_secs(60));

        assert!(matches!(
            catalog.products().await,
            Err(EvalSyncError::RemoteApi(_))
        ));
    }

    #[tokio::test]
    async fn test_store_outage_falls_through_to_api() {
        let mut api = MockRemoteApi::new();
        api.expect_get_json()
            .times(1)
            .returning(|_| Ok(json!([{"id": 4, "sku": "SKU-4", "name": "Drill"}])));

        let store = Arc::new(InMemoryOfflineStore::new());
        store.set_available(false);
        let catalog = CatalogService::new(Arc::new(api), store, Duration::from_secs(60));

        let products = catalog.products().await.unwrap();
        assert_eq!(products[0].sku, "SKU-4");
    }

    #[tokio::test]
    async fn test_evaluations_bypass_cache() {
        let mut api = MockRemoteApi::new();
        api.expect_get_json()
            .withf(|path| path.ends_with("/api/evaluations"))
            .times(2)
            .returning(|_| {
                Ok(json!([
                    {"id": 1, "product_id": 7, "overall_score": 4.2, "employee_email": "a@x"}
                ]))
            });

        let store = Arc::new(InMemoryOfflineStore::new());
        let catalog = CatalogService::new(Arc::new(api), store, Duration::from_secs(60));

        let first = catalog.evaluations().await.unwrap();
        catalog.evaluations().await.unwrap();
        assert_eq!(first[0].product_id, 7);
        assert_eq!(first[0].overall_score, 4.2);
    }
}
