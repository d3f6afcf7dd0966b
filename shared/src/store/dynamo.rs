use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::{
    AttributeValue, Delete, Put, ReturnValue, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;

use crate::error::{
    map_dynamo_error, map_transact_dynamo_error, map_update_dynamo_error, Result, ServiceError,
};
use crate::filter::DocumentFilter;
use crate::models::{FieldChange, GuestPatch, GuestRecord, NotificationLogEntry};

// Default table names
pub const GUEST_TABLE_NAME: &str = "guests";
pub const GUEST_SERIALS_TABLE_NAME: &str = "guest-serials";
pub const NOTIFICATION_LOG_TABLE_NAME: &str = "notification-log";

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Builds a DynamoDB client from the default credential chain, optionally
/// pointed at a different endpoint (DynamoDB Local)
pub async fn create_client(endpoint: Option<&str>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(endpoint) = endpoint {
        log::info!("Using DynamoDB endpoint override: {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }
    let config = loader.load().await;

    Client::new(&config)
}

// DynamoGuestStore

/// DynamoDB store for guests.
///
/// Guests live in one table keyed on `id`. Serial number uniqueness is kept
/// by a second table holding one lock item per `serialNumber`; every write
/// that claims a serial does so in the same transaction as the guest write.
pub struct DynamoGuestStore {
    client: Client,
    table_name: String,
    serials_table_name: String,
}

impl DynamoGuestStore {
    pub fn with_client_and_tables(
        client: Client,
        table_name: String,
        serials_table_name: String,
    ) -> Self {
        Self {
            client,
            table_name,
            serials_table_name,
        }
    }

    pub(crate) async fn get_guest(&self, id: &str) -> Result<GuestRecord> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| map_dynamo_error("get_item", e))?;

        let item = response
            .item()
            .ok_or_else(|| ServiceError::NotFound(format!("Guest not found: {}", id)))?;

        Ok(from_item(item.clone())?)
    }

    fn serial_lock(&self, serial_number: i64, guest_id: &str) -> Result<Put> {
        let item = HashMap::from([
            (
                "serialNumber".to_string(),
                AttributeValue::N(serial_number.to_string()),
            ),
            ("guestId".to_string(), AttributeValue::S(guest_id.to_string())),
        ]);

        Ok(Put::builder()
            .table_name(&self.serials_table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(serialNumber)")
            .build()?)
    }

    async fn update_with_new_serial(
        &self,
        current: &GuestRecord,
        changes: &[FieldChange],
        new_serial: i64,
    ) -> Result<GuestRecord> {
        let expression = UpdateExpression::from_changes(changes)?;

        // Both writes assume the serial read above is still current
        let mut names = expression.names;
        names.insert("#sn".to_string(), "serialNumber".to_string());
        let mut values = expression.values.unwrap_or_default();
        values.insert(
            ":current_serial".to_string(),
            AttributeValue::N(current.serial_number.to_string()),
        );

        let update_guest = Update::builder()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(current.id.clone()))
            .update_expression(expression.expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .condition_expression("attribute_exists(#id) AND #sn = :current_serial")
            .build()?;

        let release_old_serial = Delete::builder()
            .table_name(&self.serials_table_name)
            .key(
                "serialNumber",
                AttributeValue::N(current.serial_number.to_string()),
            )
            .condition_expression("guestId = :guest_id")
            .expression_attribute_values(":guest_id", AttributeValue::S(current.id.clone()))
            .build()?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().update(update_guest).build())
            .transact_items(
                TransactWriteItem::builder()
                    .put(self.serial_lock(new_serial, &current.id)?)
                    .build(),
            )
            .transact_items(
                TransactWriteItem::builder()
                    .delete(release_old_serial)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                map_transact_dynamo_error(e, |reasons| {
                    serial_change_failure(reasons, &current.id, new_serial)
                })
            })?;

        self.get_guest(&current.id).await
    }
}

#[async_trait]
impl super::GuestStore for DynamoGuestStore {
    async fn create_guest(&self, guest: GuestRecord) -> Result<GuestRecord> {
        let item = to_item(&guest)?;

        let put_guest = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", "id")
            .build()?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(put_guest).build())
            .transact_items(
                TransactWriteItem::builder()
                    .put(self.serial_lock(guest.serial_number, &guest.id)?)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                map_transact_dynamo_error(e, |reasons| {
                    if reasons.first().map(String::as_str) == Some(CONDITIONAL_CHECK_FAILED) {
                        ServiceError::ValidationError(format!(
                            "Guest with ID {} already exists",
                            guest.id
                        ))
                    } else {
                        duplicate_serial(guest.serial_number)
                    }
                })
            })?;

        Ok(guest)
    }

    /// Full table scan; the filter is evaluated in process since callers may
    /// filter on any attribute
    async fn find_guests(&self, filter: &DocumentFilter) -> Result<Vec<GuestRecord>> {
        let guests: Vec<GuestRecord> = scan_table(&self.client, &self.table_name).await?;
        filter.select(guests)
    }

    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<GuestRecord> {
        let mut changes = patch.changes()?;

        if let Some(new_serial) = patch.serial_number.as_value() {
            let current = self.get_guest(id).await?;
            if current.serial_number != *new_serial {
                return self
                    .update_with_new_serial(&current, &changes, *new_serial)
                    .await;
            }
            // The serial is only ever written alongside its lock item
            changes.retain(|change| change.field != "serialNumber");
        }

        if changes.is_empty() {
            return self.get_guest(id).await;
        }

        let expression = UpdateExpression::from_changes(&changes)?;

        let response = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression(expression.expression)
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(expression.values)
            .condition_expression("attribute_exists(#id)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| map_update_dynamo_error(e, id))?;

        let attributes = response.attributes().ok_or_else(|| {
            ServiceError::StoreUnavailable(format!("update_item returned no attributes for {}", id))
        })?;

        Ok(from_item(attributes.clone())?)
    }
}

// DynamoNotificationLogStore

/// DynamoDB store for the webhook log
pub struct DynamoNotificationLogStore {
    client: Client,
    table_name: String,
}

impl DynamoNotificationLogStore {
    pub fn with_client_and_table(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl super::NotificationLogStore for DynamoNotificationLogStore {
    async fn append_entry(&self, entry: NotificationLogEntry) -> Result<NotificationLogEntry> {
        let item = to_item(&entry)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| map_dynamo_error("put_item", e))?;

        Ok(entry)
    }

    async fn find_entries(&self, filter: &DocumentFilter) -> Result<Vec<NotificationLogEntry>> {
        let entries: Vec<NotificationLogEntry> =
            scan_table(&self.client, &self.table_name).await?;
        filter.select(entries)
    }
}

// Reads every item of a table, following scan pagination
async fn scan_table<T: DeserializeOwned>(client: &Client, table_name: &str) -> Result<Vec<T>> {
    let mut records = Vec::new();
    let mut start_key = None;

    loop {
        let response = client
            .scan()
            .table_name(table_name)
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(|e| map_dynamo_error("scan", e))?;

        for item in response.items() {
            records.push(from_item(item.clone())?);
        }

        match response.last_evaluated_key() {
            Some(key) if !key.is_empty() => start_key = Some(key.clone()),
            _ => break,
        }
    }

    log::debug!("Scanned {} items from '{}'", records.len(), table_name);
    Ok(records)
}

// Reasons arrive in request order: guest update, new serial lock, old serial lock
fn serial_change_failure(reasons: &[String], id: &str, new_serial: i64) -> ServiceError {
    let failed = |index: usize| {
        reasons.get(index).map(String::as_str) == Some(CONDITIONAL_CHECK_FAILED)
    };

    if failed(1) && !failed(0) {
        duplicate_serial(new_serial)
    } else {
        ServiceError::Conflict(format!(
            "Guest {} was modified concurrently, retry the update",
            id
        ))
    }
}

fn duplicate_serial(serial_number: i64) -> ServiceError {
    ServiceError::ValidationError(format!(
        "Serial number {} is already assigned to another guest",
        serial_number
    ))
}

/// SET/REMOVE expression for a list of field changes. `#id` is always
/// bound so the existence condition can refer to it.
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: Option<HashMap<String, AttributeValue>>,
}

impl UpdateExpression {
    fn from_changes(changes: &[FieldChange]) -> Result<Self> {
        let mut sets = Vec::new();
        let mut removes = Vec::new();
        let mut names = HashMap::from([("#id".to_string(), "id".to_string())]);
        let mut values = HashMap::new();

        for (index, change) in changes.iter().enumerate() {
            let name = format!("#f{}", index);
            names.insert(name.clone(), change.field.to_string());

            match &change.value {
                Some(value) => {
                    let placeholder = format!(":v{}", index);
                    let attribute: AttributeValue = to_attribute_value(value)?;
                    values.insert(placeholder.clone(), attribute);
                    sets.push(format!("{} = {}", name, placeholder));
                }
                None => removes.push(name),
            }
        }

        let mut clauses = Vec::new();
        if !sets.is_empty() {
            clauses.push(format!("SET {}", sets.join(", ")));
        }
        if !removes.is_empty() {
            clauses.push(format!("REMOVE {}", removes.join(", ")));
        }

        Ok(Self {
            expression: clauses.join(" "),
            names,
            values: if values.is_empty() { None } else { Some(values) },
        })
    }
}
