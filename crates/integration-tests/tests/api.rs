//! The HTTP surface, driven through the router in-process.

#![allow(clippy::unwrap_used)]

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use sourcing_hub_gateway::app;
use sourcing_hub_gateway::state::AppState;
use sourcing_hub_integration_tests::{alibaba_config, spawn, test_config, token_json};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let app = app(AppState::new(test_config()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_without_sources_is_a_400() {
    let app = app(AppState::new(test_config()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/search?q=earbuds&sources=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_with_unknown_source_is_a_400() {
    let app = app(AppState::new(test_config()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/search?q=earbuds&sources=alibaba,etsy")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_returns_per_source_tagged_products() {
    let upstream = Router::new()
        .route("/auth/token", post(|| async { Json(token_json(3600)) }))
        .route(
            "/product/search",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": { "products": [
                        { "productId": 44, "subject": "Desk Mat", "price": "6.80" },
                    ]},
                }))
            }),
        );
    let addr = spawn(upstream).await;

    let mut config = test_config();
    config.alibaba = Some(alibaba_config(addr));
    let app = app(AppState::new(config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/search?q=desk%20mat&sources=alibaba")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["query"], "desk mat");
    let products = body["results"]["alibaba"]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], "44");
    assert_eq!(products[0]["title"], "Desk Mat");
    assert_eq!(products[0]["price"], "6.80");
    assert_eq!(products[0]["source"], "alibaba");
    assert_eq!(body["results"]["alibaba"]["degraded"], false);
}

#[tokio::test]
async fn sources_index_reports_configured_flags() {
    let mut config = test_config();
    config.alibaba = Some(alibaba_config("127.0.0.1:9".parse().unwrap()));
    let app = app(AppState::new(config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sources")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let statuses = body.as_array().unwrap();
    assert_eq!(statuses.len(), 4);

    let alibaba = statuses
        .iter()
        .find(|s| s["source"] == "alibaba")
        .unwrap();
    assert_eq!(alibaba["configured"], true);

    let cj = statuses
        .iter()
        .find(|s| s["source"] == "cj-dropshipping")
        .unwrap();
    assert_eq!(cj["configured"], false);
}

#[tokio::test]
async fn clear_credentials_returns_no_content() {
    let app = app(AppState::new(test_config()));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/sources/alibaba/credentials")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn batch_endpoint_returns_results_in_submission_order() {
    let upstream = Router::new()
        .route("/auth/token", post(|| async { Json(token_json(3600)) }))
        .route(
            "/product/search",
            get(|| async { Json(json!({ "success": true, "data": { "products": [] } })) }),
        );
    let addr = spawn(upstream).await;

    let mut config = test_config();
    config.alibaba = Some(alibaba_config(addr));
    let app = app(AppState::new(config));

    let payload = json!({
        "queries": ["first", "second"],
        "sources": ["alibaba"],
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/search/batch")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["query"], "first");
    assert_eq!(results[1]["query"], "second");
}
