//! Admin endpoint tests, run in-process against the router.

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use helpers::test_engine;
use vision_bridge::admin_server::{admin_router, AdminState};
use vision_bridge::config::VideoInputSettings;
use vision_bridge::nodes::{NodeRegistry, VideoInputNode};
use vision_bridge::ProcessingStats;

fn state_with_node() -> (AdminState, Arc<VideoInputNode>) {
    let (node, _samples) = VideoInputNode::new(
        "cam-1",
        test_engine(),
        VideoInputSettings::default(),
        "http://127.0.0.1:9",
    );
    let node = Arc::new(node);
    let registry = NodeRegistry::new();
    registry.register(Arc::clone(&node));
    (
        AdminState::new(registry, Arc::new(ProcessingStats::new())),
        node,
    )
}

async fn post(state: AdminState, uri: &str) -> (StatusCode, String) {
    let response = admin_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn test_enable_and_disable() {
    let (state, node) = state_with_node();

    let (status, body) = post(state.clone(), "/video-input/cam-1/enable").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "activated");
    assert!(node.is_active());

    let (status, body) = post(state, "/video-input/cam-1/disable").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "deactivated");
    assert!(!node.is_active());
}

#[tokio::test]
async fn test_unknown_node_is_not_found() {
    let (state, _node) = state_with_node();
    let (status, _) = post(state, "/video-input/missing/enable").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_state_leaves_node_unchanged() {
    let (state, node) = state_with_node();
    node.enable();

    let (status, _) = post(state, "/video-input/cam-1/pause").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(node.is_active());
    node.close();
}

#[tokio::test]
async fn test_metrics_lists_counters() {
    let (state, node) = state_with_node();
    node.enable();

    let response = admin_router(state)
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);

    let body = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("# TYPE vision_bridge_errors_total counter"));
    assert!(text.contains("vision_bridge_errors_total{type=\"HttpRequestTimeoutError\"} 0"));
    assert!(text.contains("vision_bridge_active_pollers 1"));
    node.close();
}
