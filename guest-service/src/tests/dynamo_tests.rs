use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use super::utils::{create_test_guests, TEST_TIMEOUT};
use crate::routes::create_router_with_state;
use crate::state::AppState;
use guestlist_shared::store::dynamo::{DynamoGuestStore, DynamoNotificationLogStore};
use guestlist_shared::store::GuestStore;
use guestlist_shared::test_utils::dynamo_test_utils::{
    clear_dynamo_table, create_dynamo_client, create_guest_tables, create_notification_table,
    use_dynamodb,
};
use guestlist_shared::test_utils::http_test_utils::{create_test_request, response_to_json};
use guestlist_shared::test_utils::test_logging::init_test_logging;

const GUEST_TABLE: &str = "guests-router-test";
const SERIALS_TABLE: &str = "guest-serials-router-test";
const LOG_TABLE: &str = "notification-log-router-test";

#[tokio::test]
async fn test_router_against_dynamodb() {
    if !use_dynamodb() {
        println!("Skipping DynamoDB router test; set USE_DYNAMODB=true to run it");
        return;
    }
    init_test_logging();

    let client = create_dynamo_client().await;
    create_guest_tables(&client, GUEST_TABLE, SERIALS_TABLE)
        .await
        .expect("Failed to create guest tables");
    create_notification_table(&client, LOG_TABLE)
        .await
        .expect("Failed to create notification table");
    clear_dynamo_table(&client, GUEST_TABLE, "id").await;
    clear_dynamo_table(&client, SERIALS_TABLE, "serialNumber").await;

    let guests = Arc::new(DynamoGuestStore::with_client_and_tables(
        client.clone(),
        GUEST_TABLE.to_string(),
        SERIALS_TABLE.to_string(),
    ));
    for guest in create_test_guests() {
        guests.create_guest(guest).await.unwrap();
    }
    let messages = Arc::new(DynamoNotificationLogStore::with_client_and_table(
        client,
        LOG_TABLE.to_string(),
    ));
    let router = create_router_with_state(AppState::new(guests, messages, TEST_TIMEOUT), "");

    let response = router
        .clone()
        .oneshot(create_test_request(
            "GET",
            "/api/cards?searchQuery=Ami&filterStatus=invited",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "g-1");

    let response = router
        .clone()
        .oneshot(create_test_request(
            "PUT",
            "/update/card",
            Some(json!({ "id": "g-2", "invitedWedding": true, "reference": null })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;
    assert_eq!(body["invitedWedding"], json!(true));
    assert!(body.get("reference").is_none());
    assert_eq!(body["weddingAmount"], json!(500.0));

    let response = router
        .oneshot(create_test_request(
            "POST",
            "/guests",
            Some(json!({ "name": "Duplicate", "serialNumber": 3 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
