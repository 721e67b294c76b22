//! Health probes and request id propagation through the full router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reform_shop_integration_tests::TestContext;
use tower::ServiceExt;

#[tokio::test]
async fn test_liveness_is_ok() {
    let ctx = TestContext::new();
    let (status, _) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_without_database_is_unavailable() {
    let ctx = TestContext::new();
    let (status, _) = ctx.get("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-1234")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "edge-1234");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new();
    let (status, _) = ctx.get("/functions/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
