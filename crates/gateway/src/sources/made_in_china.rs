//! Made-in-China product search connector.
//!
//! Same token-bearer REST shape as Alibaba but with Made-in-China's own
//! endpoint layout and response envelope (`code`/`msg`/`data.list`).

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
use crate::config::MadeInChinaConfig;

/// Made-in-China product search connector.
pub struct MadeInChinaConnector {
    client: reqwest::Client,
    config: Option<MadeInChinaConfig>,
    credentials: Arc<CredentialCache>,
}

impl MadeInChinaConnector {
    /// Create the connector; `config` is `None` when credentials are unset.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(
        config: Option<MadeInChinaConfig>,
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

    fn require_config(&self) -> Result<&MadeInChinaConfig, SourceError> {
        self.config.as_ref().ok_or(SourceError::Configuration {
            source: SourceId::MadeInChina,
        })
    }

    async fn bearer_token(&self, config: &MadeInChinaConfig) -> Result<SecretString, SourceError> {
        let credential = self
            .credentials
            .get_or_authenticate(SourceId::MadeInChina, || {
                authenticate(
                    &self.client,
                    SourceId::MadeInChina,
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
impl SourceConnector for MadeInChinaConnector {
    fn source(&self) -> SourceId {
        SourceId::MadeInChina
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32) -> Result<RawProductBatch, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(RawProductBatch::empty(SourceId::MadeInChina));
        }

        let config = match self.require_config() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "skipping source");
                return Ok(RawProductBatch::empty(SourceId::MadeInChina));
            }
        };

        let token = self.bearer_token(config).await?;
        let page_size = limit.to_string();

        let response = self
            .client
            .get(format!("{}/prod/search", config.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("word", query), ("pageSize", page_size.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Source {
                source: SourceId::MadeInChina,
                message: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let body: MicSearchResponse = response.json().await.map_err(|e| SourceError::Parse {
            source: SourceId::MadeInChina,
            message: e.to_string(),
        })?;

        // Made-in-China reports failures in-band with a non-zero code.
        if let Some(code) = body.code
            && code != 0
        {
            return Err(SourceError::Source {
                source: SourceId::MadeInChina,
                message: body
                    .msg
                    .unwrap_or_else(|| format!("upstream error code {code}")),
            });
        }

        let products = body.data.map(|d| d.list).unwrap_or_default();
        Ok(RawProductBatch::MadeInChina(products))
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
struct MicSearchResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<MicSearchData>,
}

#[derive(Debug, Deserialize)]
struct MicSearchData {
    #[serde(default)]
    list: Vec<MicProduct>,
}

/// A raw Made-in-China product record.
#[derive(Debug, Clone, Deserialize)]
pub struct MicProduct {
    #[serde(default, rename = "prodId", alias = "id")]
    pub prod_id: Option<Value>,
    #[serde(default, rename = "prodName", alias = "productName", alias = "name")]
    pub prod_name: Option<String>,
    #[serde(default, rename = "briefDesc", alias = "description")]
    pub brief_desc: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "picUrl", alias = "imageUrl")]
    pub pic_url: Option<String>,
    #[serde(default, rename = "comName", alias = "companyName", alias = "supplier")]
    pub com_name: Option<String>,
    #[serde(default, rename = "prodUrl", alias = "detailUrl")]
    pub prod_url: Option<String>,
    #[serde(default, rename = "moq", alias = "minOrder")]
    pub moq: Option<Value>,
}
