//! HTTP route handlers for the sourcing gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                            - Liveness check
//!
//! # Search
//! GET    /api/search                        - Multi-source product search
//! POST   /api/search/batch                  - Sequential multi-query search
//!
//! # Sources
//! GET    /api/sources                       - Configured-source overview
//! GET    /api/sources/{source}/health       - Per-source auth health
//! DELETE /api/sources/{source}/credentials  - Force credential refresh
//! ```

pub mod search;
pub mod sources;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the search routes router.
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search::search))
        .route("/batch", post(search::batch))
}

/// Create the source management routes router.
pub fn source_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sources::index))
        .route("/{source}/health", get(sources::health))
        .route("/{source}/credentials", delete(sources::clear_credentials))
}

/// Create all routes for the gateway.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/search", search_routes())
        .nest("/api/sources", source_routes())
}
