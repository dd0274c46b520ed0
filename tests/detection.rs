//! Integration tests for the detection node.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::test_engine;
use vision_bridge::config::DetectionSettings;
use vision_bridge::error_handling::{InfoType, WarningType};
use vision_bridge::fetch::{Payload, RequestMessage};
use vision_bridge::nodes::{BusyGate, DetectionNode, StatusFill, StatusShape, TEXT_NO_RESPONSE};
use vision_bridge::NodeError;

fn node_for(url: &str) -> DetectionNode {
    DetectionNode::new(
        test_engine(),
        DetectionSettings {
            model_name: "yolo".to_string(),
            show_result: true,
        },
        url,
        Arc::new(BusyGate::new()),
    )
}

fn frame() -> RequestMessage {
    RequestMessage {
        payload: Some(Payload::from(json!({"frame": "abc"}))),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_detection_forwards_image_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("modelname", "yolo"))
        .and(header("showresult", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("vision", "{'boxes':[]}")
                .insert_header("busy", "0")
                .set_body_string("ok"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let node = node_for(&server.uri());
    let output = node
        .handle(frame())
        .await
        .expect("detection succeeds")
        .expect("backend was not busy");

    assert_eq!(output.image, "ok");
    assert_eq!(output.result, json!({"boxes": []}));
    assert!(!node.gate().is_busy());
    assert!(node.status().current().is_cleared());
}

#[tokio::test]
async fn test_busy_backend_drops_following_inputs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("busy", "1")
                .set_body_string("later"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let node = node_for(&server.uri());
    assert_eq!(node.handle(frame()).await.expect("request succeeds"), None);
    assert!(node.gate().is_busy());

    // Dropped without a request while the gate is set
    assert_eq!(node.handle(frame()).await.expect("drop is not an error"), None);

    server.verify().await;
}

#[tokio::test]
async fn test_busy_drop_is_counted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = test_engine();
    let stats = Arc::clone(engine.stats());
    let gate = Arc::new(BusyGate::new());
    gate.set(true);
    let node = DetectionNode::new(engine, DetectionSettings::default(), server.uri(), gate);

    assert_eq!(node.handle(frame()).await.expect("drop is not an error"), None);
    assert_eq!(stats.get_info_count(InfoType::BusyDrop), 1);
}

#[tokio::test]
async fn test_unparsable_vision_yields_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("vision", "boxes: none")
                .set_body_string("img"),
        )
        .mount(&server)
        .await;

    let engine = test_engine();
    let stats = Arc::clone(engine.stats());
    let node = DetectionNode::new(
        engine,
        DetectionSettings::default(),
        server.uri(),
        Arc::new(BusyGate::new()),
    );

    let output = node
        .handle(frame())
        .await
        .expect("detection succeeds")
        .expect("backend was not busy");
    assert_eq!(output.image, "img");
    assert_eq!(output.result, json!({}));
    assert_eq!(stats.get_warning_count(WarningType::VisionParseError), 1);
}

#[tokio::test]
async fn test_connection_failure_sets_error_status() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let node = node_for(&format!("http://127.0.0.1:{}", port));
    let err = node
        .handle(frame())
        .await
        .expect_err("nothing listens on the port");
    let NodeError::Request(failure) = err else {
        panic!("expected a request failure");
    };

    let status = node.status().current();
    assert_eq!(status.fill, Some(StatusFill::Red));
    assert_eq!(status.shape, Some(StatusShape::Ring));
    assert_eq!(status.text.as_deref(), Some(failure.status_code()));
    assert!(!node.gate().is_busy());
}

#[tokio::test]
async fn test_timeout_reports_no_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let node = node_for(&server.uri());
    let message = RequestMessage {
        request_timeout: Some(json!(50)),
        ..frame()
    };
    assert!(node.handle(message).await.is_err());

    let status = node.status().current();
    assert_eq!(status.text.as_deref(), Some(TEXT_NO_RESPONSE));

    node.close();
    assert!(node.status().current().is_cleared());
}
