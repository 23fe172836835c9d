//! Integration tests for Sourcing Hub.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sourcing-hub-integration-tests
//! ```
//!
//! Every upstream the gateway talks to is mocked with an in-process axum
//! server bound on `127.0.0.1:0` - no external services and no real
//! credentials are involved. This library provides the shared plumbing:
//! spawning mock upstreams and building gateway configs that point the
//! connectors at them.
//!
//! # Test Categories
//!
//! - `search_aggregation` - Fan-out, partial failure, and degradation
//! - `credential_cache` - Token reuse, expiry, and forced invalidation
//! - `batch_sequencing` - Strict one-query-at-a-time batch mode
//! - `api` - The HTTP surface, driven through the router in-process

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use serde_json::{Value, json};

use sourcing_hub_gateway::config::{
    AlibabaConfig, CjDropshippingConfig, GatewayConfig, MadeInChinaConfig, SearchConfig,
    ShopifyCatalogConfig,
};

/// Bind a mock upstream on an ephemeral port and serve it in the background.
///
/// # Panics
///
/// Panics if the loopback listener cannot be bound.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener addr");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("serve mock upstream");
    });

    addr
}

/// A token response in the uniform shape every auth endpoint speaks.
#[must_use]
pub fn token_json(expires_in: i64) -> Value {
    json!({ "access_token": "integration-token", "expires_in": expires_in })
}

/// Gateway config with no sources enabled and a fast retry schedule.
///
/// The retry base delay is shrunk so exhausting three attempts costs
/// ~150ms instead of ~3s; the backoff *shape* is asserted separately in
/// the retry executor's own paused-time tests.
#[must_use]
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        sentry_dsn: None,
        search: SearchConfig {
            request_timeout: Duration::from_secs(2),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(50),
            default_limit: 20,
        },
        alibaba: None,
        made_in_china: None,
        cj_dropshipping: None,
        shopify_catalog: None,
    }
}

/// Alibaba credentials pointing at a mock upstream.
#[must_use]
pub fn alibaba_config(addr: SocketAddr) -> AlibabaConfig {
    AlibabaConfig {
        base_url: format!("http://{addr}"),
        token_url: format!("http://{addr}/auth/token"),
        client_id: "integration-client".to_string(),
        client_secret: SecretString::from("integration-secret"),
    }
}

/// Made-in-China credentials pointing at a mock upstream.
#[must_use]
pub fn made_in_china_config(addr: SocketAddr) -> MadeInChinaConfig {
    MadeInChinaConfig {
        base_url: format!("http://{addr}"),
        token_url: format!("http://{addr}/auth/token"),
        client_id: "integration-client".to_string(),
        client_secret: SecretString::from("integration-secret"),
    }
}

/// CJ Dropshipping credentials pointing at a mock upstream.
#[must_use]
pub fn cj_config(addr: SocketAddr) -> CjDropshippingConfig {
    CjDropshippingConfig {
        base_url: format!("http://{addr}"),
        token_url: format!("http://{addr}/auth/token"),
        client_id: "integration-client".to_string(),
        client_secret: SecretString::from("integration-secret"),
    }
}

/// Shopify catalog endpoint pointing at a mock upstream.
#[must_use]
pub fn shopify_catalog_config(addr: SocketAddr) -> ShopifyCatalogConfig {
    ShopifyCatalogConfig {
        endpoint: format!("http://{addr}/api/mcp"),
    }
}
