//! Sourcing Hub Gateway library.
//!
//! This crate provides the gateway functionality as a library, allowing it
//! to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod routes;
pub mod sources;
pub mod state;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the gateway router around an application state.
///
/// Shared by the binary and by integration tests that drive the router
/// in-process.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check upstreams - use
/// `/api/sources/{source}/health` for that.
async fn health() -> &'static str {
    "ok"
}
