//! Integration tests against DynamoDB Local. Skipped unless USE_DYNAMODB=true.

use chrono::Utc;
use serde_json::json;

use crate::error::ServiceError;
use crate::filter::DocumentFilter;
use crate::models::{Amount, GuestPatch, GuestRecord, NotificationLogEntry};
use crate::store::dynamo::{DynamoGuestStore, DynamoNotificationLogStore};
use crate::store::{GuestStore, NotificationLogStore};
use crate::test_utils::dynamo_test_utils::{
    clear_dynamo_table, create_dynamo_client, create_guest_tables, create_notification_table,
    use_dynamodb,
};
use crate::test_utils::test_logging::init_test_logging;

const GUEST_TABLE: &str = "guests-store-test";
const SERIALS_TABLE: &str = "guest-serials-store-test";
const LOG_TABLE: &str = "notification-log-store-test";
const RACE_GUEST_TABLE: &str = "guests-renumber-test";
const RACE_SERIALS_TABLE: &str = "guest-serials-renumber-test";

fn guest(id: &str, serial_number: i64) -> GuestRecord {
    GuestRecord {
        id: id.to_string(),
        name: format!("Guest {}", serial_number),
        serial_number,
        reference: Some("Groom's side".into()),
        location: None,
        telephone: None,
        holud_amount: Some(Amount(1000.0)),
        wedding_amount: None,
        reception_amount: None,
        invited: false,
        invited_holud: false,
        invited_wedding: false,
        invited_reception: false,
    }
}

#[tokio::test]
async fn test_dynamo_guest_store() {
    if !use_dynamodb() {
        println!("Skipping DynamoDB guest store test; set USE_DYNAMODB=true to run it");
        return;
    }
    init_test_logging();

    let client = create_dynamo_client().await;
    create_guest_tables(&client, GUEST_TABLE, SERIALS_TABLE)
        .await
        .expect("Failed to create guest tables");
    let store = DynamoGuestStore::with_client_and_tables(
        client,
        GUEST_TABLE.to_string(),
        SERIALS_TABLE.to_string(),
    );

    store.create_guest(guest("g1", 1)).await.unwrap();
    store.create_guest(guest("g2", 2)).await.unwrap();

    // Serial numbers are unique
    let duplicate = store.create_guest(guest("g3", 1)).await;
    assert!(matches!(duplicate, Err(ServiceError::ValidationError(_))));

    // Single-field update leaves the rest alone
    let patch: GuestPatch =
        serde_json::from_value(json!({ "invitedHolud": true, "reference": null })).unwrap();
    let updated = store.update_guest("g1", &patch).await.unwrap();
    assert!(updated.invited_holud);
    assert_eq!(updated.reference, None);
    assert_eq!(updated.holud_amount, Some(Amount(1000.0)));

    // Moving to a taken serial fails, moving to a free one releases the old one
    let steal: GuestPatch = serde_json::from_value(json!({ "serialNumber": 2 })).unwrap();
    assert!(matches!(
        store.update_guest("g1", &steal).await,
        Err(ServiceError::ValidationError(_))
    ));
    let renumber: GuestPatch = serde_json::from_value(json!({ "serialNumber": 5 })).unwrap();
    assert_eq!(store.update_guest("g1", &renumber).await.unwrap().serial_number, 5);
    store.create_guest(guest("g4", 1)).await.unwrap();

    let missing = store.update_guest("nope", &patch).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    let filter = DocumentFilter::parse(&json!({ "serialNumber": { "$gte": 2 } })).unwrap();
    let mut found: Vec<i64> = store
        .find_guests(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.serial_number)
        .collect();
    found.sort();
    assert_eq!(found, vec![2, 5]);
}

#[tokio::test]
async fn test_dynamo_concurrent_renumbers_keep_one_lock() {
    if !use_dynamodb() {
        println!("Skipping DynamoDB renumber test; set USE_DYNAMODB=true to run it");
        return;
    }
    init_test_logging();

    let client = create_dynamo_client().await;
    create_guest_tables(&client, RACE_GUEST_TABLE, RACE_SERIALS_TABLE)
        .await
        .expect("Failed to create guest tables");
    clear_dynamo_table(&client, RACE_GUEST_TABLE, "id").await;
    clear_dynamo_table(&client, RACE_SERIALS_TABLE, "serialNumber").await;
    let store = DynamoGuestStore::with_client_and_tables(
        client.clone(),
        RACE_GUEST_TABLE.to_string(),
        RACE_SERIALS_TABLE.to_string(),
    );
    store.create_guest(guest("g1", 1)).await.unwrap();

    let to_two: GuestPatch = serde_json::from_value(json!({ "serialNumber": 2 })).unwrap();
    let to_three: GuestPatch = serde_json::from_value(json!({ "serialNumber": 3 })).unwrap();
    let (first, second) = tokio::join!(
        store.update_guest("g1", &to_two),
        store.update_guest("g1", &to_three)
    );
    for result in [&first, &second] {
        assert!(matches!(result, Ok(_) | Err(ServiceError::Conflict(_))));
    }
    assert!(first.is_ok() || second.is_ok());

    // Re-sending the current serial with another change is a plain update
    let current = store.get_guest("g1").await.unwrap();
    let rename: GuestPatch = serde_json::from_value(
        json!({ "serialNumber": current.serial_number, "name": "Renamed" }),
    )
    .unwrap();
    let renamed = store.update_guest("g1", &rename).await.unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.serial_number, current.serial_number);

    let locks = client
        .scan()
        .table_name(RACE_SERIALS_TABLE)
        .send()
        .await
        .unwrap();
    let held: Vec<String> = locks
        .items()
        .iter()
        .filter(|item| {
            item.get("guestId")
                .and_then(|v| v.as_s().ok())
                .map(String::as_str)
                == Some("g1")
        })
        .filter_map(|item| item.get("serialNumber").and_then(|v| v.as_n().ok()).cloned())
        .collect();
    assert_eq!(held, vec![current.serial_number.to_string()]);
}

#[tokio::test]
async fn test_dynamo_notification_log_store() {
    if !use_dynamodb() {
        println!("Skipping DynamoDB notification log test; set USE_DYNAMODB=true to run it");
        return;
    }
    init_test_logging();

    let client = create_dynamo_client().await;
    create_notification_table(&client, LOG_TABLE)
        .await
        .expect("Failed to create notification table");
    let store = DynamoNotificationLogStore::with_client_and_table(client, LOG_TABLE.to_string());

    let entry = NotificationLogEntry::from_webhook(
        &json!({ "event": "message", "data": { "nested": [1, "two", null] } }),
        Utc::now(),
    );
    store.append_entry(entry.clone()).await.unwrap();

    let found = store.find_entries(&DocumentFilter::All).await.unwrap();
    assert_eq!(found, vec![entry]);
}
