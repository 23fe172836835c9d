//! CJ Dropshipping product search connector.
//!
//! CJ's API takes the access token in a `CJ-Access-Token` header rather
//! than a bearer `Authorization` header, and product search is a POST with
//! a JSON filter body.

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
use crate::config::CjDropshippingConfig;

/// CJ Dropshipping product search connector.
pub struct CjDropshippingConnector {
    client: reqwest::Client,
    config: Option<CjDropshippingConfig>,
    credentials: Arc<CredentialCache>,
}

impl CjDropshippingConnector {
    /// Create the connector; `config` is `None` when credentials are unset.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(
        config: Option<CjDropshippingConfig>,
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

    fn require_config(&self) -> Result<&CjDropshippingConfig, SourceError> {
        self.config.as_ref().ok_or(SourceError::Configuration {
            source: SourceId::CjDropshipping,
        })
    }

    async fn access_token(
        &self,
        config: &CjDropshippingConfig,
    ) -> Result<SecretString, SourceError> {
        let credential = self
            .credentials
            .get_or_authenticate(SourceId::CjDropshipping, || {
                authenticate(
                    &self.client,
                    SourceId::CjDropshipping,
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
impl SourceConnector for CjDropshippingConnector {
    fn source(&self) -> SourceId {
        SourceId::CjDropshipping
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32) -> Result<RawProductBatch, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(RawProductBatch::empty(SourceId::CjDropshipping));
        }

        let config = match self.require_config() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "skipping source");
                return Ok(RawProductBatch::empty(SourceId::CjDropshipping));
            }
        };

        let token = self.access_token(config).await?;

        let response = self
            .client
            .post(format!("{}/product/list", config.base_url))
            .header("CJ-Access-Token", token.expose_secret())
            .json(&serde_json::json!({
                "productNameEn": query,
                "pageNum": 1,
                "pageSize": limit,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Source {
                source: SourceId::CjDropshipping,
                message: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let body: CjSearchResponse = response.json().await.map_err(|e| SourceError::Parse {
            source: SourceId::CjDropshipping,
            message: e.to_string(),
        })?;

        // CJ flags failures both with `result: false` and non-200 codes.
        let failed = body.result == Some(false) || body.code.is_some_and(|code| code != 200);
        if failed {
            return Err(SourceError::Source {
                source: SourceId::CjDropshipping,
                message: body
                    .message
                    .unwrap_or_else(|| "unspecified upstream error".to_string()),
            });
        }

        let products = body.data.map(|d| d.list).unwrap_or_default();
        Ok(RawProductBatch::CjDropshipping(products))
    }

    async fn health_check(&self) -> bool {
        let Ok(config) = self.require_config() else {
            return false;
        };
        self.access_token(config).await.is_ok()
    }
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct CjSearchResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    result: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<CjSearchData>,
}

#[derive(Debug, Deserialize)]
struct CjSearchData {
    #[serde(default)]
    list: Vec<CjProduct>,
}

/// A raw CJ Dropshipping product record.
#[derive(Debug, Clone, Deserialize)]
pub struct CjProduct {
    #[serde(default)]
    pub pid: Option<Value>,
    #[serde(default, rename = "productNameEn", alias = "productName")]
    pub product_name_en: Option<String>,
    #[serde(default, rename = "remark", alias = "description")]
    pub remark: Option<String>,
    #[serde(default, rename = "sellPrice", alias = "price")]
    pub sell_price: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "productImage", alias = "bigImage")]
    pub product_image: Option<String>,
    #[serde(default, rename = "supplierName")]
    pub supplier_name: Option<String>,
    #[serde(default, rename = "productUrl")]
    pub product_url: Option<String>,
    #[serde(default, rename = "moq", alias = "packQty")]
    pub moq: Option<Value>,
    #[serde(default, rename = "score", alias = "rating")]
    pub score: Option<Value>,
}
