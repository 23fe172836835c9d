//! Source status and credential management handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use sourcing_hub_core::SourceId;

use crate::error::Result;
use crate::state::AppState;

/// Configured status of one source.
#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub source: SourceId,
    pub configured: bool,
}

/// List every source and whether it has credentials configured.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    let config = state.config();

    let statuses = SourceId::ALL
        .into_iter()
        .map(|source| SourceStatus {
            source,
            configured: match source {
                SourceId::Alibaba => config.alibaba.is_some(),
                SourceId::MadeInChina => config.made_in_china.is_some(),
                SourceId::CjDropshipping => config.cj_dropshipping.is_some(),
                SourceId::ShopifyCatalog => config.shopify_catalog.is_some(),
            },
        })
        .collect();

    Json(statuses)
}

/// Per-source health payload.
#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub source: SourceId,
    pub healthy: bool,
}

/// Check whether one source's authentication currently succeeds.
#[instrument(skip(state))]
pub async fn health(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<SourceHealth>> {
    let source: SourceId = source.parse()?;
    let healthy = state.sourcing().health_check(source).await;
    Ok(Json(SourceHealth { source, healthy }))
}

/// Forcibly invalidate one source's cached credentials.
///
/// The next search against that source performs a fresh token exchange.
#[instrument(skip(state))]
pub async fn clear_credentials(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<StatusCode> {
    let source: SourceId = source.parse()?;
    state.sourcing().clear_credentials(source).await;
    Ok(StatusCode::NO_CONTENT)
}
