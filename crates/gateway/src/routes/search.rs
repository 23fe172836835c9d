//! Search route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use sourcing_hub_core::{AggregatedSearchResult, SearchRequest, SourceId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for `GET /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Comma-separated source names, e.g. `alibaba,cj-dropshipping`.
    #[serde(default)]
    pub sources: String,
    pub limit: Option<u32>,
}

fn parse_sources(raw: &str) -> Result<Vec<SourceId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<SourceId>().map_err(AppError::from))
        .collect()
}

/// Multi-source product search.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AggregatedSearchResult>> {
    let request = SearchRequest {
        query: query.q,
        sources: parse_sources(&query.sources)?,
        limit: query.limit,
    };

    let result = state.sourcing().search_all(&request).await?;
    Ok(Json(result))
}

/// Body for `POST /api/search/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchSearchRequest {
    pub queries: Vec<String>,
    pub sources: Vec<SourceId>,
    pub limit: Option<u32>,
}

/// Sequential multi-query search against one set of sources.
#[instrument(skip(state, request), fields(query_count = request.queries.len()))]
pub async fn batch(
    State(state): State<AppState>,
    Json(request): Json<BatchSearchRequest>,
) -> Result<Json<Vec<AggregatedSearchResult>>> {
    let results = state
        .sourcing()
        .search_batch(&request.queries, &request.sources, request.limit)
        .await?;
    Ok(Json(results))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources_splits_and_trims() {
        let sources = parse_sources("alibaba, cj-dropshipping").unwrap();
        assert_eq!(sources, vec![SourceId::Alibaba, SourceId::CjDropshipping]);
    }

    #[test]
    fn test_parse_sources_empty_string_is_empty() {
        assert!(parse_sources("").unwrap().is_empty());
        assert!(parse_sources(" , ,").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sources_rejects_unknown_names() {
        let err = parse_sources("alibaba,etsy").unwrap_err();
        assert!(matches!(err, AppError::UnknownSource(_)));
    }
}
