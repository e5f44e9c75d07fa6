//! Tests for the HTTP automation-driver adapter against a mock service

use canary_core::Action;
use canary_runtime::{AutomationDriver, ScreenshotStore};
use canary_worker::driver::WebhookDriver;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn successful_action_maps_to_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({"action": "navigate"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "details": {"final_url": "https://example.com/home"}
        })))
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let outcome = driver
        .execute(
            Action::Navigate,
            Some("https://example.com"),
            None,
            Duration::from_secs(5),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(
        outcome.details.unwrap()["final_url"],
        "https://example.com/home"
    );
}

#[tokio::test]
async fn failed_action_carries_driver_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "element '#missing' not found"
        })))
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let outcome = driver
        .execute(Action::Click, Some("#missing"), None, Duration::from_secs(5))
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("#missing"));
}

#[tokio::test]
async fn non_2xx_response_is_failure_not_panic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let outcome = driver
        .execute(Action::Assert, Some("#x"), None, Duration::from_secs(5))
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("500"));
}

#[tokio::test]
async fn slow_driver_times_out_with_keyword() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let outcome = driver
        .execute(
            Action::Navigate,
            Some("https://slow"),
            None,
            Duration::from_millis(100),
        )
        .await;

    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.contains("timed out"), "{}", error);
}

#[tokio::test]
async fn screenshot_capture_returns_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screenshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artifact": "screenshots/exec-1/step-2.png"
        })))
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let reference = driver.capture_and_store(Uuid::new_v4(), 2).await;
    assert_eq!(reference.as_deref(), Some("screenshots/exec-1/step-2.png"));
}

#[tokio::test]
async fn screenshot_capture_failure_is_absent_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screenshot"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let driver = WebhookDriver::new(server.uri()).unwrap();
    let reference = driver.capture_and_store(Uuid::new_v4(), 0).await;
    assert!(reference.is_none());
}
