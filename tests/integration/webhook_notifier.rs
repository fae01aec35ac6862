//! Integration tests for the webhook notifier against a mock endpoint

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use network_logger::alerts::{AlertEvent, Notifier, NotifyError, WebhookNotifier};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::host;

fn down_event() -> AlertEvent {
    AlertEvent::host_down(&host("db.internal"), Utc::now())
}

#[tokio::test]
async fn test_alert_is_posted_as_json() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(body_partial_json(serde_json::json!({
            "host": "db.internal",
            "subject": "Host db.internal is down!",
            "recipient": "alert@example.com",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(
        format!("{}/alerts", mock_server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();

    notifier.notify(&down_event()).await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(mock_server.uri(), Duration::from_secs(5)).unwrap();

    assert_matches!(
        notifier.notify(&down_event()).await,
        Err(NotifyError::Rejected { status: 500 })
    );
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let notifier = WebhookNotifier::new(mock_server.uri(), Duration::from_millis(200)).unwrap();

    assert_matches!(
        notifier.notify(&down_event()).await,
        Err(NotifyError::Timeout(_))
    );
}
