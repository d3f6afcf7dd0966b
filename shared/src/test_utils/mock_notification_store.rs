use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::filter::DocumentFilter;
use crate::models::NotificationLogEntry;
use crate::store::NotificationLogStore;

/// In-memory NotificationLogStore. A failing instance rejects every call,
/// which lets tests check that the webhook swallows store errors.
pub struct MockNotificationLogStore {
    entries: Mutex<Vec<NotificationLogEntry>>,
    failing: bool,
}

impl MockNotificationLogStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    pub fn with_data(entries: Vec<NotificationLogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Everything appended so far, in arrival order
    pub fn entries(&self) -> Vec<NotificationLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing {
            Err(ServiceError::StoreUnavailable(
                "mock notification store is offline".into(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for MockNotificationLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationLogStore for MockNotificationLogStore {
    async fn append_entry(&self, entry: NotificationLogEntry) -> Result<NotificationLogEntry> {
        self.check_available()?;
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn find_entries(&self, filter: &DocumentFilter) -> Result<Vec<NotificationLogEntry>> {
        self.check_available()?;
        filter.select(self.entries())
    }
}
