use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use crate::models::catalog::ProductInfo;

/// Product lookup capability: resolves a product id against the external
/// catalog of record.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, product_id: Uuid) -> Result<ProductInfo, CatalogError>;
}

/// Client for the HTTP catalog-of-record service.
pub struct HttpCatalogClient {
    http: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProductCatalog for HttpCatalogClient {
    async fn product(&self, product_id: Uuid) -> Result<ProductInfo, CatalogError> {
        let url = format!("{}/products/{}", self.base_url, product_id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(CatalogError::Http)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(product_id));
        }
        if !response.status().is_success() {
            return Err(CatalogError::Api(format!(
                "catalog service returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(CatalogError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog service error: {0}")]
    Api(String),

    #[error("product {0} not found in catalog of record")]
    NotFound(Uuid),
}
