use axum::{body::Body, http::Request, http::StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tower::ServiceExt;

use super::utils::{create_test_app, create_test_app_with};
use guestlist_shared::models::NotificationLogEntry;
use guestlist_shared::test_utils::http_test_utils::{
    create_test_request, response_to_json, response_to_text,
};
use guestlist_shared::test_utils::mock_notification_store::MockNotificationLogStore;

fn entry(event: &str, session: &str, timestamp: DateTime<Utc>) -> NotificationLogEntry {
    NotificationLogEntry::from_webhook(
        &json!({ "event": event, "sessionId": session, "data": { "from": "8801711000001" } }),
        timestamp,
    )
}

#[tokio::test]
async fn test_webhook_without_timestamp_uses_arrival_time() {
    let app = create_test_app();
    let before = Utc::now();

    let response = app
        .router
        .oneshot(create_test_request(
            "POST",
            "/webhook",
            Some(json!({
                "event": "message",
                "sessionId": "session-1",
                "data": { "body": "Assalamu alaikum", "fromMe": false }
            })),
        ))
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_text(response).await, "Webhook received");

    let entries = app.messages.entries();
    assert_eq!(entries.len(), 1);
    let stored = &entries[0];
    assert_eq!(stored.event_name.as_deref(), Some("message"));
    assert_eq!(stored.session_id.as_deref(), Some("session-1"));
    assert_eq!(
        stored.payload,
        json!({ "body": "Assalamu alaikum", "fromMe": false })
    );
    assert!(stored.timestamp >= before && stored.timestamp <= after);
}

#[tokio::test]
async fn test_webhook_keeps_sender_timestamp() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(create_test_request(
            "POST",
            "/webhook",
            Some(json!({ "event": "status", "timestamp": "2024-03-01T10:15:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = app.messages.entries();
    assert_eq!(
        entries[0].timestamp,
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap()
    );
}

#[tokio::test]
async fn test_webhook_acknowledges_when_store_fails() {
    let app = create_test_app_with(true, MockNotificationLogStore::failing());

    let response = app
        .router
        .oneshot(create_test_request(
            "POST",
            "/webhook",
            Some(json!({ "event": "message" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_text(response).await, "Webhook received");
}

#[tokio::test]
async fn test_webhook_accepts_non_json_body() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "text/plain")
        .body(Body::from("ping"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let entries = app.messages.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_name, None);
    assert_eq!(entries[0].payload, serde_json::Value::Null);
}

#[tokio::test]
async fn test_messages_filter() {
    let now = Utc::now();
    let app = create_test_app_with(
        true,
        MockNotificationLogStore::with_data(vec![
            entry("message", "session-1", now),
            entry("status", "session-1", now),
            entry("message", "session-2", now),
        ]),
    );

    let response = app
        .router
        .clone()
        .oneshot(create_test_request("GET", "/whastappMessages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_json(response).await.as_array().unwrap().len(), 3);

    let response = app
        .router
        .oneshot(create_test_request(
            "GET",
            "/whastappMessages",
            Some(json!({ "eventName": "message", "sessionId": { "$ne": "session-1" } })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["sessionId"], "session-2");
    assert_eq!(found[0]["payload"], json!({ "from": "8801711000001" }));
}

#[tokio::test]
async fn test_messages_errors() {
    let app = create_test_app_with(false, MockNotificationLogStore::new());
    let response = app
        .router
        .oneshot(create_test_request("GET", "/whastappMessages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = create_test_app();
    let response = app
        .router
        .oneshot(create_test_request(
            "GET",
            "/whastappMessages",
            Some(json!({ "$where": "true" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = create_test_app_with(true, MockNotificationLogStore::failing());
    let response = app
        .router
        .oneshot(create_test_request("GET", "/whastappMessages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response_to_json(response).await["message"],
        "Failed to fetch messages"
    );
}
