//! Concurrent multi-source search aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, instrument};

use sourcing_hub_core::{AggregatedSearchResult, SearchRequest, SourceContribution, SourceId};

use super::alibaba::AlibabaConnector;
use super::cj_dropshipping::CjDropshippingConnector;
use super::credentials::CredentialCache;
use super::made_in_china::MadeInChinaConnector;
use super::normalize;
use super::retry::{RetryPolicy, SourceOutcome, run_with_retries};
use super::shopify_catalog::ShopifyCatalogConnector;
use super::SourceConnector;
use crate::config::GatewayConfig;

/// Caller mistakes rejected synchronously, before any upstream I/O.
///
/// This is the only error class a search caller ever sees; upstream
/// failures degrade to empty per-source contributions instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchRequestError {
    #[error("no sources selected")]
    NoSourcesSelected,
}

/// The product sourcing service.
///
/// One instance owns every connector, the shared credential cache, and the
/// retry policy. Construct it once at startup and pass it by reference -
/// it clones cheaply via `Arc`, and sharing one instance is what makes the
/// credential cache effective across concurrent requests.
#[derive(Clone)]
pub struct SourcingService {
    inner: Arc<SourcingServiceInner>,
}

struct SourcingServiceInner {
    connectors: Vec<Arc<dyn SourceConnector>>,
    credentials: Arc<CredentialCache>,
    retry: RetryPolicy,
    default_limit: u32,
}

impl SourcingService {
    /// Build the service and its connectors from configuration.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        let credentials = Arc::new(CredentialCache::new());
        let timeout = config.search.request_timeout;

        let connectors: Vec<Arc<dyn SourceConnector>> = vec![
            Arc::new(AlibabaConnector::new(
                config.alibaba.clone(),
                Arc::clone(&credentials),
                timeout,
            )),
            Arc::new(MadeInChinaConnector::new(
                config.made_in_china.clone(),
                Arc::clone(&credentials),
                timeout,
            )),
            Arc::new(CjDropshippingConnector::new(
                config.cj_dropshipping.clone(),
                Arc::clone(&credentials),
                timeout,
            )),
            Arc::new(ShopifyCatalogConnector::new(
                config.shopify_catalog.clone(),
                timeout,
            )),
        ];

        let retry = RetryPolicy {
            max_attempts: config.search.max_attempts,
            base_delay: config.search.retry_base_delay,
            ..RetryPolicy::default()
        };

        Self {
            inner: Arc::new(SourcingServiceInner {
                connectors,
                credentials,
                retry,
                default_limit: config.search.default_limit,
            }),
        }
    }

    fn connector(&self, source: SourceId) -> Option<Arc<dyn SourceConnector>> {
        self.inner
            .connectors
            .iter()
            .find(|connector| connector.source() == source)
            .cloned()
    }

    /// Fan one search out to the selected sources concurrently.
    ///
    /// All per-source calls settle before the result is assembled; a source
    /// that fails every retry contributes an empty (degraded) list under
    /// its own key rather than failing the aggregation. A blank query is
    /// answered immediately with an empty result and zero upstream calls.
    ///
    /// # Errors
    ///
    /// Returns `SearchRequestError::NoSourcesSelected` when the request
    /// names no sources - the one caller mistake that is a hard failure.
    #[instrument(skip(self, request), fields(query = %request.query, sources = request.sources.len()))]
    pub async fn search_all(
        &self,
        request: &SearchRequest,
    ) -> Result<AggregatedSearchResult, SearchRequestError> {
        if request.sources.is_empty() {
            return Err(SearchRequestError::NoSourcesSelected);
        }

        let started = Instant::now();
        let query = request.query.trim();
        let limit = request.limit.unwrap_or(self.inner.default_limit);

        if query.is_empty() {
            return Ok(AggregatedSearchResult {
                query: String::new(),
                results: BTreeMap::new(),
                elapsed_ms: elapsed_ms(started),
            });
        }

        // Selecting a source twice means querying it once.
        let mut selected = request.sources.clone();
        selected.sort_unstable();
        selected.dedup();

        let searches = selected.into_iter().map(|source| {
            let connector = self.connector(source);
            async move {
                let Some(connector) = connector else {
                    return (source, SourceContribution::default());
                };

                let outcome = run_with_retries(&self.inner.retry, source, || {
                    connector.search(query, limit)
                })
                .await;

                let contribution = match outcome {
                    SourceOutcome::Complete(batch) => {
                        SourceContribution::from_products(normalize::normalize(batch))
                    }
                    SourceOutcome::Degraded => SourceContribution::degraded(),
                };
                (source, contribution)
            }
        });

        let results: BTreeMap<SourceId, SourceContribution> =
            join_all(searches).await.into_iter().collect();

        let result = AggregatedSearchResult {
            query: query.to_string(),
            results,
            elapsed_ms: elapsed_ms(started),
        };

        info!(
            total = result.total_products(),
            elapsed_ms = result.elapsed_ms,
            "aggregated search complete"
        );
        Ok(result)
    }

    /// Run several distinct queries against the same sources, one query at
    /// a time.
    ///
    /// Queries are sequenced on purpose: within one query the sources fan
    /// out concurrently, but firing N whole fan-outs at once is an easy way
    /// to get rate limited by the upstreams. Results come back in
    /// submission order.
    ///
    /// # Errors
    ///
    /// Returns `SearchRequestError::NoSourcesSelected` when `sources` is
    /// empty.
    #[instrument(skip(self, queries, sources), fields(query_count = queries.len()))]
    pub async fn search_batch(
        &self,
        queries: &[String],
        sources: &[SourceId],
        limit: Option<u32>,
    ) -> Result<Vec<AggregatedSearchResult>, SearchRequestError> {
        if sources.is_empty() {
            return Err(SearchRequestError::NoSourcesSelected);
        }

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let request = SearchRequest {
                query: query.clone(),
                sources: sources.to_vec(),
                limit,
            };
            results.push(self.search_all(&request).await?);
        }
        Ok(results)
    }

    /// Whether `source`'s authentication currently succeeds.
    pub async fn health_check(&self, source: SourceId) -> bool {
        match self.connector(source) {
            Some(connector) => connector.health_check().await,
            None => false,
        }
    }

    /// Forcibly invalidate cached credentials for `source`.
    pub async fn clear_credentials(&self, source: SourceId) {
        self.inner.credentials.clear(source).await;
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::super::normalize::RawProductBatch;
    use super::super::{SourceConnector, SourceError};

    /// Connector stub: succeeds with canned records or always fails.
    struct StubConnector {
        source: SourceId,
        calls: AtomicU32,
        records: Result<Vec<serde_json::Value>, ()>,
    }

    impl StubConnector {
        fn succeeding(source: SourceId, records: Vec<serde_json::Value>) -> Self {
            Self {
                source,
                calls: AtomicU32::new(0),
                records: Ok(records),
            }
        }

        fn failing(source: SourceId) -> Self {
            Self {
                source,
                calls: AtomicU32::new(0),
                records: Err(()),
            }
        }
    }

    #[async_trait]
    impl SourceConnector for StubConnector {
        fn source(&self) -> SourceId {
            self.source
        }

        async fn search(&self, query: &str, _limit: u32) -> Result<RawProductBatch, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.trim().is_empty() {
                return Ok(RawProductBatch::empty(self.source));
            }
            match &self.records {
                Ok(records) => Ok(RawProductBatch::Alibaba(
                    records
                        .iter()
                        .map(|r| serde_json::from_value(r.clone()).unwrap())
                        .collect(),
                )),
                Err(()) => Err(SourceError::Source {
                    source: self.source,
                    message: "stubbed outage".to_string(),
                }),
            }
        }

        async fn health_check(&self) -> bool {
            self.records.is_ok()
        }
    }

    fn service(connectors: Vec<Arc<StubConnector>>) -> SourcingService {
        let connectors: Vec<Arc<dyn SourceConnector>> = connectors
            .into_iter()
            .map(|c| c as Arc<dyn SourceConnector>)
            .collect();
        SourcingService {
            inner: Arc::new(SourcingServiceInner {
                connectors,
                credentials: Arc::new(CredentialCache::new()),
                retry: RetryPolicy {
                    max_attempts: 2,
                    base_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(10),
                },
                default_limit: 20,
            }),
        }
    }

    fn request(query: &str, sources: &[SourceId]) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            sources: sources.to_vec(),
            limit: None,
        }
    }

    #[tokio::test]
    async fn test_no_sources_is_rejected_before_io() {
        let stub = Arc::new(StubConnector::succeeding(SourceId::Alibaba, vec![]));
        let service = service(vec![Arc::clone(&stub)]);

        let err = service.search_all(&request("earbuds", &[])).await.unwrap_err();
        assert_eq!(err, SearchRequestError::NoSourcesSelected);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty_without_calls() {
        let stub = Arc::new(StubConnector::succeeding(SourceId::Alibaba, vec![]));
        let service = service(vec![Arc::clone(&stub)]);

        let result = service
            .search_all(&request("   ", &[SourceId::Alibaba]))
            .await
            .unwrap();

        assert!(result.results.is_empty());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_failing_source_does_not_sink_the_others() {
        let good = Arc::new(StubConnector::succeeding(
            SourceId::Alibaba,
            vec![json!({"productId": 1, "subject": "A"}), json!({"productId": 2, "subject": "B"})],
        ));
        let bad = Arc::new(StubConnector::failing(SourceId::CjDropshipping));
        let service = service(vec![Arc::clone(&good), Arc::clone(&bad)]);

        let result = service
            .search_all(&request(
                "earbuds",
                &[SourceId::Alibaba, SourceId::CjDropshipping],
            ))
            .await
            .unwrap();

        let alibaba = result.results.get(&SourceId::Alibaba).unwrap();
        assert_eq!(alibaba.products.len(), 2);
        assert!(!alibaba.degraded);

        // The failed source is present with an empty list, not missing.
        let cj = result.results.get(&SourceId::CjDropshipping).unwrap();
        assert!(cj.products.is_empty());
        assert!(cj.degraded);

        // max_attempts = 2 in the test policy
        assert_eq!(bad.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicate_source_selection_queries_once() {
        let stub = Arc::new(StubConnector::succeeding(SourceId::Alibaba, vec![]));
        let service = service(vec![Arc::clone(&stub)]);

        let result = service
            .search_all(&request("earbuds", &[SourceId::Alibaba, SourceId::Alibaba]))
            .await
            .unwrap();

        assert_eq!(result.results.len(), 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_preserves_submission_order() {
        let stub = Arc::new(StubConnector::succeeding(SourceId::Alibaba, vec![]));
        let service = service(vec![Arc::clone(&stub)]);

        let results = service
            .search_batch(
                &["first".to_string(), "second".to_string()],
                &[SourceId::Alibaba],
                None,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query, "first");
        assert_eq!(results[1].query, "second");
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_sources() {
        let service = service(vec![]);
        let err = service
            .search_batch(&["q".to_string()], &[], None)
            .await
            .unwrap_err();
        assert_eq!(err, SearchRequestError::NoSourcesSelected);
    }

    #[tokio::test]
    async fn test_health_check_unknown_connector_is_unhealthy() {
        let service = service(vec![]);
        assert!(!service.health_check(SourceId::ShopifyCatalog).await);
    }
}
