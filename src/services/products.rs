//! Product catalog API client.
//!
//! All calls go through the intercepted pipeline, so they carry the session's
//! bearer credential and a 401/403 ends the session like any other API call.

#[cfg(test)]
#[path = "products_test.rs"]
mod tests;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::net::error::ClassifiedError;
use crate::net::transport::{ApiRequest, HttpTransport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub product_type_name: Option<String>,
    #[serde(default)]
    pub product_brand: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
}

/// Payload for creating a product; brand and type are referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub description: String,
    #[serde(rename = "brand")]
    pub brand_id: i64,
    #[serde(rename = "producttype")]
    pub product_type_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandCount {
    pub brand: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub product_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardData {
    pub top_products: Vec<Product>,
    pub brand_counts: Vec<BrandCount>,
    pub type_counts: Vec<TypeCount>,
}

pub struct ProductService {
    http: Arc<dyn HttpTransport>,
    store_base: String,
}

impl ProductService {
    /// `http` must be the intercepted pipeline; `api_base` is the API base path.
    #[must_use]
    pub fn new(http: Arc<dyn HttpTransport>, api_base: &str) -> Self {
        let store_base = format!("{}/store", api_base.trim_end_matches('/'));
        Self { http, store_base }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClassifiedError> {
        let response = self.http.send(request).await.map_err(|failure| {
            let err = ClassifiedError::from(failure);
            tracing::warn!(code = err.kind.error_code(), status = err.cause.status, "catalog request failed");
            err
        })?;
        response.decode()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.store_base)
    }

    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed or undecodable exchange.
    pub async fn list_products(&self) -> Result<Vec<Product>, ClassifiedError> {
        self.fetch(ApiRequest::get(self.url("/products"))).await
    }

    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed or undecodable exchange.
    pub async fn get_product(&self, id: i64) -> Result<Product, ClassifiedError> {
        self.fetch(ApiRequest::get(self.url(&format!("/products/{id}"))))
            .await
    }

    /// Create a product. Returns whatever the server echoes back.
    ///
    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed exchange.
    pub async fn add_product(&self, product: &NewProduct) -> Result<Option<Value>, ClassifiedError> {
        let body = serde_json::to_value(product).unwrap_or_default();
        let response = self
            .http
            .send(ApiRequest::post(self.url("/product"), body))
            .await
            .map_err(ClassifiedError::from)?;
        tracing::info!(name = %product.name, "product created");
        Ok(response.json_value())
    }

    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed or undecodable exchange.
    pub async fn list_brands(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.fetch(ApiRequest::get(self.url("/brands"))).await
    }

    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed or undecodable exchange.
    pub async fn list_product_types(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.fetch(ApiRequest::get(self.url("/product-types")))
            .await
    }

    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for a failed or undecodable exchange.
    pub async fn dashboard(&self) -> Result<DashboardData, ClassifiedError> {
        self.fetch(ApiRequest::get(self.url("/dashboard"))).await
    }
}
