use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::error::Error;
// Use log macros, but ensure test_logging::init_test_logging() is called in test files
use log::{debug, error, info};

use crate::store::dynamo::create_client;

/// # DynamoDB test utilities
///
/// Table setup and cleanup for integration tests against DynamoDB Local.
/// These only run when `USE_DYNAMODB=true`; everything else uses the mock
/// stores.
///
/// ## Example
/// ```rust,ignore
/// use guestlist_shared::test_utils::dynamo_test_utils;
///
/// #[tokio::test]
/// async fn my_dynamo_test() {
///     if !dynamo_test_utils::use_dynamodb() {
///         return;
///     }
///     let client = dynamo_test_utils::create_dynamo_client().await;
///     dynamo_test_utils::create_guest_tables(&client, "guests-test", "serials-test")
///         .await
///         .unwrap();
/// }
/// ```

// Constants for DynamoDB tests
pub const DYNAMO_LOCAL_URI: &str = "http://localhost:8000";

// Helper to check if DynamoDB integration tests should be used
pub fn use_dynamodb() -> bool {
    std::env::var("USE_DYNAMODB").unwrap_or_default() == "true"
}

// Helper to set up a DynamoDB client for local testing
pub async fn create_dynamo_client() -> Client {
    create_client(Some(DYNAMO_LOCAL_URI)).await
}

/// Creates (or recreates) a table with a single hash key
pub async fn create_dynamo_table(
    client: &Client,
    table_name: &str,
    key_name: &str,
    key_type: ScalarAttributeType,
) -> Result<(), Box<dyn Error>> {
    info!("Creating dynamo table '{}' keyed on '{}'", table_name, key_name);

    let tables = client.list_tables().send().await?;
    if tables.table_names().contains(&table_name.to_string()) {
        info!("Table '{}' already exists, deleting it first...", table_name);
        client.delete_table().table_name(table_name).send().await?;

        loop {
            let tables = client.list_tables().send().await?;
            if !tables.table_names().contains(&table_name.to_string()) {
                break;
            }
            debug!("Table '{}' still exists, waiting...", table_name);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    client
        .create_table()
        .table_name(table_name)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(key_name)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(key_name)
                .attribute_type(key_type)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await?;

    loop {
        let resp = client.describe_table().table_name(table_name).send().await?;
        let status = resp.table().and_then(|table| table.table_status());
        if status == Some(&TableStatus::Active) {
            break;
        }
        debug!("Table '{}' status: {:?}", table_name, status);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }

    info!("Table '{}' is ready for testing!", table_name);
    Ok(())
}

/// Creates the guest table and its serial-number lock table
pub async fn create_guest_tables(
    client: &Client,
    table_name: &str,
    serials_table_name: &str,
) -> Result<(), Box<dyn Error>> {
    create_dynamo_table(client, table_name, "id", ScalarAttributeType::S).await?;
    create_dynamo_table(
        client,
        serials_table_name,
        "serialNumber",
        ScalarAttributeType::N,
    )
    .await
}

pub async fn create_notification_table(
    client: &Client,
    table_name: &str,
) -> Result<(), Box<dyn Error>> {
    create_dynamo_table(client, table_name, "id", ScalarAttributeType::S).await
}

// Helper to clean a DynamoDB table between tests
pub async fn clear_dynamo_table(client: &Client, table_name: &str, key_name: &str) {
    let mut last_key = None;
    loop {
        let scan_resp = match client
            .scan()
            .table_name(table_name)
            .set_exclusive_start_key(last_key.take())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                // Ignore scan errors to keep the test running
                error!("Failed to scan table '{}': {}", table_name, e);
                break;
            }
        };

        for item in scan_resp.items() {
            if let Some(key) = item.get(key_name) {
                let key: HashMap<String, AttributeValue> =
                    HashMap::from([(key_name.to_string(), key.clone())]);
                if let Err(e) = client
                    .delete_item()
                    .table_name(table_name)
                    .set_key(Some(key))
                    .send()
                    .await
                {
                    error!("Failed to delete item from table '{}': {}", table_name, e);
                }
            }
        }

        last_key = scan_resp.last_evaluated_key().cloned();
        if last_key.is_none() {
            break;
        }
    }
}
