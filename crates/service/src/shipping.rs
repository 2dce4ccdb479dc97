//! Delivery-point lookup through the Nova Poshta JSON API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Reference accepted by `warehouses`.
    #[serde(rename = "ref")]
    pub city_ref: String,
    pub name: String,
    pub area: String,
    /// Full display name, e.g. "м. Київ, Київська обл.".
    pub present: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(rename = "ref")]
    pub warehouse_ref: String,
    pub number: String,
    pub description: String,
    pub short_address: String,
}

#[async_trait]
pub trait ShippingDirectory: Send + Sync {
    async fn cities(&self, query: &str) -> Result<Vec<City>, ServiceError>;
    async fn warehouses(&self, city_ref: &str) -> Result<Vec<Warehouse>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettlementSearch {
    #[serde(default)]
    addresses: Vec<SettlementAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettlementAddress {
    present: String,
    main_description: String,
    #[serde(default)]
    area: String,
    delivery_city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WarehouseRow {
    #[serde(rename = "Ref")]
    warehouse_ref: String,
    #[serde(default)]
    number: String,
    description: String,
    #[serde(default)]
    short_address: String,
}

pub struct NovaPoshtaClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl NovaPoshtaClient {
    pub fn new(cfg: &configs::NovaPoshtaConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self { client, api_url: cfg.api_url.clone(), api_key: cfg.api_key.clone() })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, properties: serde_json::Value) -> Result<Vec<T>, ServiceError> {
        let body = json!({
            "apiKey": self.api_key,
            "modelName": "Address",
            "calledMethod": method,
            "methodProperties": properties,
        });
        let resp = self.client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("nova poshta: {e}")))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Upstream(format!("nova poshta returned {}", resp.status())));
        }
        let parsed: ApiResponse<T> = resp.json().await.map_err(|e| ServiceError::Upstream(format!("nova poshta: {e}")))?;
        unwrap_response(parsed)
    }
}

fn unwrap_response<T>(resp: ApiResponse<T>) -> Result<Vec<T>, ServiceError> {
    if !resp.success {
        let msg = if resp.errors.is_empty() { "request failed".to_string() } else { resp.errors.join("; ") };
        return Err(ServiceError::Upstream(format!("nova poshta: {}", msg)));
    }
    Ok(resp.data)
}

fn to_cities(found: Vec<SettlementSearch>) -> Vec<City> {
    found
        .into_iter()
        .flat_map(|s| s.addresses)
        .map(|a| City { city_ref: a.delivery_city, name: a.main_description, area: a.area, present: a.present })
        .collect()
}

#[async_trait]
impl ShippingDirectory for NovaPoshtaClient {
    async fn cities(&self, query: &str) -> Result<Vec<City>, ServiceError> {
        let found: Vec<SettlementSearch> = self
            .call("searchSettlements", json!({ "CityName": query, "Limit": "20", "Page": "1" }))
            .await?;
        Ok(to_cities(found))
    }

    async fn warehouses(&self, city_ref: &str) -> Result<Vec<Warehouse>, ServiceError> {
        let rows: Vec<WarehouseRow> = self.call("getWarehouses", json!({ "CityRef": city_ref })).await?;
        Ok(rows
            .into_iter()
            .map(|w| Warehouse { warehouse_ref: w.warehouse_ref, number: w.number, description: w.description, short_address: w.short_address })
            .collect())
    }
}

/// Caches successful lookups of any directory for a fixed TTL.
pub struct CachedDirectory<D> {
    inner: D,
    cities: Cache<String, Arc<Vec<City>>>,
    warehouses: Cache<String, Arc<Vec<Warehouse>>>,
}

impl<D: ShippingDirectory> CachedDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        let cities = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
        let warehouses = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
        Self { inner, cities, warehouses }
    }
}

#[async_trait]
impl<D: ShippingDirectory> ShippingDirectory for CachedDirectory<D> {
    async fn cities(&self, query: &str) -> Result<Vec<City>, ServiceError> {
        let key = query.trim().to_lowercase();
        if key.is_empty() {
            return Err(ServiceError::Validation("city query is required".into()));
        }
        if let Some(hit) = self.cities.get(&key).await {
            debug!(query = %key, "city lookup served from cache");
            return Ok(hit.as_ref().clone());
        }
        let found = self.inner.cities(&key).await?;
        self.cities.insert(key, Arc::new(found.clone())).await;
        Ok(found)
    }

    async fn warehouses(&self, city_ref: &str) -> Result<Vec<Warehouse>, ServiceError> {
        let key = city_ref.trim().to_string();
        if key.is_empty() {
            return Err(ServiceError::Validation("city_ref is required".into()));
        }
        if let Some(hit) = self.warehouses.get(&key).await {
            return Ok(hit.as_ref().clone());
        }
        let found = self.inner.warehouses(&key).await?;
        self.warehouses.insert(key, Arc::new(found.clone())).await;
        Ok(found)
    }
}

/// Nova Poshta client with the configured cache in front of it.
pub fn from_config(cfg: &configs::NovaPoshtaConfig) -> Result<Arc<dyn ShippingDirectory>, ServiceError> {
    let client = NovaPoshtaClient::new(cfg)?;
    Ok(Arc::new(CachedDirectory::new(client, Duration::from_secs(cfg.cache_ttl_secs))))
}

pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed directory that counts upstream calls.
    #[derive(Default)]
    pub struct StaticDirectory {
        pub cities: Vec<City>,
        pub warehouses: Vec<Warehouse>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ShippingDirectory for StaticDirectory {
        async fn cities(&self, query: &str) -> Result<Vec<City>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let q = query.to_lowercase();
            Ok(self.cities.iter().filter(|c| c.name.to_lowercase().contains(&q)).cloned().collect())
        }

        async fn warehouses(&self, city_ref: &str) -> Result<Vec<Warehouse>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if city_ref == "unknown" {
                return Err(ServiceError::Upstream("nova poshta: City not found".into()));
            }
            Ok(self.warehouses.clone())
        }
    }
}
