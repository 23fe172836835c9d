//! Alibaba open-platform product search connector.
//!
//! Token-bearer REST: client credentials are exchanged for a bearer token
//! (cached in the shared [`CredentialCache`]), then product search is a GET
//! against the marketplace search endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use sourcing_hub_core::SourceId;

use super::credentials::{CredentialCache, authenticate};
use super::normalize::RawProductBatch;
use super::{SourceConnector, SourceError};
use crate::config::AlibabaConfig;

/// Alibaba product search connector.
pub struct AlibabaConnector {
    client: reqwest::Client,
    config: Option<AlibabaConfig>,
    credentials: Arc<CredentialCache>,
}

impl AlibabaConnector {
    /// Create the connector.
    ///
    /// `config` is `None` when the source's credentials are not set; the
    /// connector then contributes empty results instead of failing.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(
        config: Option<AlibabaConfig>,
        credentials: Arc<CredentialCache>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            credentials,
        }
    }

    fn require_config(&self) -> Result<&AlibabaConfig, SourceError> {
        self.config.as_ref().ok_or(SourceError::Configuration {
            source: SourceId::Alibaba,
        })
    }

    /// Resolve a bearer token through the shared credential cache.
    async fn bearer_token(&self, config: &AlibabaConfig) -> Result<SecretString, SourceError> {
        let credential = self
            .credentials
            .get_or_authenticate(SourceId::Alibaba, || {
                authenticate(
                    &self.client,
                    SourceId::Alibaba,
                    &config.token_url,
                    &config.client_id,
                    &config.client_secret,
                )
            })
            .await?;

        Ok(credential.access_token)
    }
}

#[async_trait]
impl SourceConnector for AlibabaConnector {
    fn source(&self) -> SourceId {
        SourceId::Alibaba
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32) -> Result<RawProductBatch, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(RawProductBatch::empty(SourceId::Alibaba));
        }

        let config = match self.require_config() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "skipping source");
                return Ok(RawProductBatch::empty(SourceId::Alibaba));
            }
        };

        let token = self.bearer_token(config).await?;
        let page_size = limit.to_string();

        let response = self
            .client
            .get(format!("{}/product/search", config.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("keywords", query), ("pageSize", page_size.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Source {
                source: SourceId::Alibaba,
                message: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let body: AlibabaSearchResponse =
            response.json().await.map_err(|e| SourceError::Parse {
                source: SourceId::Alibaba,
                message: e.to_string(),
            })?;

        if body.success == Some(false) {
            return Err(SourceError::Source {
                source: SourceId::Alibaba,
                message: body
                    .message
                    .unwrap_or_else(|| "unspecified upstream error".to_string()),
            });
        }

        let products = body.data.map(|d| d.products).unwrap_or_default();
        Ok(RawProductBatch::Alibaba(products))
    }

    async fn health_check(&self) -> bool {
        let Ok(config) = self.require_config() else {
            return false;
        };
        self.bearer_token(config).await.is_ok()
    }
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct AlibabaSearchResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<AlibabaSearchData>,
}

#[derive(Debug, Deserialize)]
struct AlibabaSearchData {
    #[serde(default)]
    products: Vec<AlibabaProduct>,
}

/// A raw Alibaba product record.
///
/// Field names vary across Alibaba API generations; aliases capture the
/// variants actually seen in the wild. Loosely-typed fields (ids, prices,
/// quantities arrive as numbers or strings) stay as [`Value`] for the
/// normalizer to coerce.
#[derive(Debug, Clone, Deserialize)]
pub struct AlibabaProduct {
    #[serde(default, rename = "productId", alias = "product_id", alias = "id")]
    pub product_id: Option<Value>,
    #[serde(default, rename = "subject", alias = "title", alias = "productTitle")]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "price", alias = "priceRange", alias = "promotionPrice")]
    pub price: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "imageUrl", alias = "productImage", alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, rename = "companyName", alias = "supplierName")]
    pub company_name: Option<String>,
    #[serde(default, rename = "detailUrl", alias = "productUrl")]
    pub detail_url: Option<String>,
    #[serde(default, rename = "minOrderQuantity", alias = "moq")]
    pub min_order_quantity: Option<Value>,
    #[serde(default, rename = "score", alias = "rating")]
    pub score: Option<Value>,
    #[serde(default, rename = "reviewCount", alias = "reviews")]
    pub review_count: Option<Value>,
}
