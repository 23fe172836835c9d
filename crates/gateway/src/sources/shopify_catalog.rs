//! Shopify global catalog connector.
//!
//! Speaks the JSON-RPC 2.0 "tool call" envelope of Shopify's product
//! discovery endpoint: searches are `tools/call` invocations of
//! `search_shop_catalog`, and the interesting payload comes back as a JSON
//! document embedded in `result.content[0].text`. The endpoint is
//! addressed per shop and takes no client-credentials exchange, so this is
//! the one connector that never touches the credential cache.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use sourcing_hub_core::SourceId;

use super::normalize::RawProductBatch;
use super::{SourceConnector, SourceError};
use crate::config::ShopifyCatalogConfig;

/// Shopify global catalog search connector.
pub struct ShopifyCatalogConnector {
    client: reqwest::Client,
    config: Option<ShopifyCatalogConfig>,
}

impl ShopifyCatalogConnector {
    /// Create the connector; `config` is `None` when no endpoint is set.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: Option<ShopifyCatalogConfig>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn require_config(&self) -> Result<&ShopifyCatalogConfig, SourceError> {
        self.config.as_ref().ok_or(SourceError::Configuration {
            source: SourceId::ShopifyCatalog,
        })
    }

    async fn call_tool(
        &self,
        config: &ShopifyCatalogConfig,
        request: &Value,
    ) -> Result<RpcResponse, SourceError> {
        let response = self
            .client
            .post(&config.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Source {
                source: SourceId::ShopifyCatalog,
                message: format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| SourceError::Parse {
            source: SourceId::ShopifyCatalog,
            message: format!("{e} in: {}", response_text.chars().take(200).collect::<String>()),
        })
    }
}

#[async_trait]
impl SourceConnector for ShopifyCatalogConnector {
    fn source(&self) -> SourceId {
        SourceId::ShopifyCatalog
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32) -> Result<RawProductBatch, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(RawProductBatch::empty(SourceId::ShopifyCatalog));
        }

        let config = match self.require_config() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "skipping source");
                return Ok(RawProductBatch::empty(SourceId::ShopifyCatalog));
            }
        };

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": "search_shop_catalog",
                "arguments": {
                    "query": query,
                    "limit": limit,
                    "context": "product sourcing",
                },
            },
        });

        let body = self.call_tool(config, &request).await?;

        if let Some(error) = body.error {
            return Err(SourceError::Source {
                source: SourceId::ShopifyCatalog,
                message: format!("RPC error {}: {}", error.code, error.message),
            });
        }

        // The tool result wraps its JSON payload in a text content block.
        let Some(text) = body
            .result
            .into_iter()
            .flat_map(|r| r.content)
            .find(|c| c.kind == "text")
            .map(|c| c.text)
        else {
            return Ok(RawProductBatch::empty(SourceId::ShopifyCatalog));
        };

        let payload: CatalogPayload =
            serde_json::from_str(&text).map_err(|e| SourceError::Parse {
                source: SourceId::ShopifyCatalog,
                message: format!("malformed tool payload: {e}"),
            })?;

        Ok(RawProductBatch::ShopifyCatalog(payload.products))
    }

    async fn health_check(&self) -> bool {
        let Ok(config) = self.require_config() else {
            return false;
        };

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
        });

        match self.call_tool(config, &request).await {
            Ok(body) => body.error.is_none(),
            Err(_) => false,
        }
    }
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<RpcResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    #[serde(default)]
    content: Vec<RpcContent>,
}

#[derive(Debug, Deserialize)]
struct RpcContent {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CatalogPayload {
    #[serde(default)]
    products: Vec<CatalogProduct>,
}

/// A raw Shopify catalog product record.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    #[serde(default, rename = "product_id", alias = "id")]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "price_range")]
    pub price_range: Option<CatalogPriceRange>,
    #[serde(default, rename = "image_url", alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, rename = "url", alias = "product_url")]
    pub url: Option<String>,
    #[serde(default, rename = "vendor", alias = "store_name")]
    pub vendor: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default, rename = "review_count")]
    pub review_count: Option<Value>,
}

/// Price range block on a catalog product.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPriceRange {
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}
