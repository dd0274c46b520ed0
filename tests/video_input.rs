//! Integration tests for the video-input node.

mod helpers;

use std::time::Duration;

use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::test_engine;
use vision_bridge::config::{DeviceSource, VideoInputSettings};
use vision_bridge::nodes::{StatusFill, VideoInputNode, STATUS_NON_HTTP};
use vision_bridge::NodeError;

fn settings(active: bool) -> VideoInputSettings {
    VideoInputSettings {
        frequency: 20,
        active,
        ..Default::default()
    }
}

async fn frame_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("resolution", "640x480"))
        .and(query_param("localAddress", "/dev/video0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("frame"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_active_node_delivers_samples() {
    let server = frame_server().await;
    let (node, mut samples) = VideoInputNode::new("cam", test_engine(), settings(true), &server.uri());
    assert!(node.is_active());

    for _ in 0..3 {
        let envelope = tokio::time::timeout(Duration::from_secs(5), samples.recv())
            .await
            .expect("sample within timeout")
            .expect("channel open");
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.payload, "frame");
    }

    node.close();
    assert!(!node.is_active());
    assert!(node.status().current().is_cleared());
}

#[tokio::test]
async fn test_inactive_node_waits_for_enable() {
    let server = frame_server().await;
    let (node, mut samples) =
        VideoInputNode::new("cam", test_engine(), settings(false), &server.uri());
    assert!(!node.is_active());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(samples.try_recv().is_err());

    node.enable();
    node.enable();
    assert!(node.is_active());
    let envelope = tokio::time::timeout(Duration::from_secs(5), samples.recv())
        .await
        .expect("sample within timeout")
        .expect("channel open");
    assert_eq!(envelope.payload, "frame");

    node.disable();
    node.disable();
    assert!(!node.is_active());

    // Let in-flight samples land, then expect silence
    tokio::time::sleep(Duration::from_millis(200)).await;
    while samples.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(samples.try_recv().is_err());
}

#[tokio::test]
async fn test_set_active_toggles_timer() {
    let server = frame_server().await;
    let (node, _samples) = VideoInputNode::new("cam", test_engine(), settings(false), &server.uri());

    node.set_active(true);
    assert!(node.is_active());
    node.set_active(false);
    assert!(!node.is_active());
}

#[tokio::test]
async fn test_poll_once_sends_one_request() {
    let server = frame_server().await;
    let (node, mut samples) =
        VideoInputNode::new("cam", test_engine(), settings(false), &server.uri());

    node.poll_once().await.expect("sample succeeds");
    let envelope = samples.try_recv().expect("sample delivered");
    assert_eq!(envelope.status_code, 200);
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn test_non_http_base_url_is_rejected() {
    let (node, mut samples) =
        VideoInputNode::new("cam", test_engine(), settings(false), "rtsp://cam/stream");

    let err = node.poll_once().await.expect_err("rtsp base is not http");
    assert!(matches!(err, NodeError::NonHttpTransport(_)));
    assert!(samples.try_recv().is_err());

    let status = node.status().current();
    assert_eq!(status.fill, Some(StatusFill::Red));
    assert_eq!(status.text.as_deref(), Some(STATUS_NON_HTTP));
}

#[tokio::test]
async fn test_rtsp_source_is_encoded_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("rtspUrl", "rtsp://cam/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let settings = VideoInputSettings {
        device: DeviceSource::Rtsp("rtsp://cam/1".to_string()),
        ..settings(false)
    };
    let (node, _samples) = VideoInputNode::new("cam", test_engine(), settings, &server.uri());
    assert!(node.sample_url().contains("rtspUrl=rtsp%3A%2F%2Fcam%2F1"));
    node.poll_once().await.expect("sample succeeds");
}

#[tokio::test]
async fn test_huge_frequency_still_samples() {
    let server = frame_server().await;
    let settings = VideoInputSettings {
        frequency: 2_000_000_000,
        active: true,
        ..Default::default()
    };
    let (node, mut samples) = VideoInputNode::new("cam", test_engine(), settings, &server.uri());
    assert_eq!(node.settings().period(), Duration::from_millis(1));

    let envelope = tokio::time::timeout(Duration::from_secs(5), samples.recv())
        .await
        .expect("sample within timeout")
        .expect("channel open");
    assert_eq!(envelope.payload, "frame");
    node.close();
}
