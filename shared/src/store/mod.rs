use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::filter::DocumentFilter;
use crate::models::{GuestPatch, GuestRecord, NotificationLogEntry};

// Expose the DynamoDB store module
pub mod dynamo;

/// GuestStore trait defining the interface for guest storage implementations
#[async_trait]
pub trait GuestStore: Send + Sync + 'static {
    /// Inserts a new guest. Fails with a validation error if the id or the
    /// serial number is already taken.
    async fn create_guest(&self, guest: GuestRecord) -> Result<GuestRecord>;

    /// Returns every guest matching the filter, in no particular order
    async fn find_guests(&self, filter: &DocumentFilter) -> Result<Vec<GuestRecord>>;

    /// Applies a validated patch to the guest with the given id and returns
    /// the stored result
    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<GuestRecord>;
}

/// Append-only store for inbound webhook payloads
#[async_trait]
pub trait NotificationLogStore: Send + Sync + 'static {
    async fn append_entry(&self, entry: NotificationLogEntry) -> Result<NotificationLogEntry>;

    async fn find_entries(&self, filter: &DocumentFilter) -> Result<Vec<NotificationLogEntry>>;
}

/// Runs a store call, failing with `Timeout` instead of waiting past `limit`
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            log::error!("Store call {} timed out after {:?}", operation, limit);
            Err(ServiceError::Timeout(format!(
                "{} did not complete within {:?}",
                operation, limit
            )))
        }
    }
}
