//! REST routes exercised in-process.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::*;
use listing_gateway::api::{build_router, AppState};
use listing_gateway::gateway::{InMemoryChain, NetworkId};
use listing_gateway::listings::ListingClient;

fn router_for(client: ListingClient) -> Router {
    build_router(
        AppState {
            client: Arc::new(client),
        },
        Duration::from_secs(10),
    )
}

fn demo() -> (Arc<InMemoryChain>, Router) {
    let chain = new_chain();
    chain.set_auto_mine(true);
    chain.seed_listing("Sentiment", "reviews", ether(1) / alloy::primitives::U256::from(2), SELLER);
    let router = router_for(client_on(chain.provider(vec![ALICE])));
    (chain, router)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, request_id)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_listings() {
    let (_chain, router) = demo();
    let (status, body, request_id) = send(&router, get("/listings")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(request_id.is_some());
    let listing = &body["listings"][0];
    assert_eq!(listing["id"], "0");
    assert_eq!(listing["name"], "Sentiment");
    assert_eq!(listing["price"], "500000000000000000");
    assert_eq!(listing["priceDisplay"], "0.5");
    assert_eq!(listing["isSold"], false);
    assert_eq!(body["pending"], json!([]));
}

#[tokio::test]
async fn test_create_then_list() {
    let (_chain, router) = demo();
    let (status, body, _) = send(
        &router,
        post_json(
            "/listings",
            json!({"name": "Detector", "description": "boxes", "price": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Listing created successfully");
    assert!(body["transactionHash"].as_str().unwrap().starts_with("0x"));

    let (_, body, _) = send(&router, get("/listings")).await;
    assert_eq!(body["listings"][1]["priceDisplay"], "2.0");
}

#[tokio::test]
async fn test_create_with_invalid_price() {
    let (chain, router) = demo();
    let (status, body, _) = send(
        &router,
        post_json(
            "/listings",
            json!({"name": "Free", "description": "gratis", "price": "0"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(body["retryable"], false);
    assert_eq!(chain.submitted_count(), 0);
}

#[tokio::test]
async fn test_purchase_flow() {
    let (chain, router) = demo();
    let (status, body, _) = send(&router, post_json("/listings/0/purchase", Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Listing purchased successfully");

    let (status, body, _) = send(&router, post_json("/listings/0/purchase", Value::Null)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_sold");
    assert_eq!(chain.submitted_count(), 1);
}

#[tokio::test]
async fn test_purchase_unknown_and_malformed_ids() {
    let (_chain, router) = demo();
    let (status, body, _) = send(&router, post_json("/listings/42/purchase", Value::Null)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "listing_not_found");

    let (status, _, _) = send(&router, post_json("/listings/abc/purchase", Value::Null)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_and_health() {
    let (_chain, router) = demo();
    let (status, body, _) = send(&router, get("/account")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"], ALICE.to_string());

    let (status, body, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "injected");
    assert_eq!(body["networkMatches"], true);
}

#[tokio::test]
async fn test_health_reports_wrong_network() {
    let chain = new_chain();
    let provider = chain.provider(vec![ALICE]);
    provider.switch_network(NetworkId(1));
    let router = router_for(client_on(provider));

    let (status, body, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["network"], 1);
}

#[tokio::test]
async fn test_unreachable_provider_is_503() {
    let router = router_for(unreachable_client());
    let (status, body, _) = send(&router, get("/listings")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "provider_unreachable");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (_chain, router) = demo();
    let request = Request::builder()
        .uri("/account")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let (_, _, request_id) = send(&router, request).await;
    assert_eq!(request_id.as_deref(), Some("req-123"));
}
