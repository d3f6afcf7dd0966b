use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::filter::DocumentFilter;
use crate::models::{GuestPatch, GuestRecord};
use crate::store::GuestStore;

/// MockGuestStore is a simple in-memory implementation of GuestStore for testing
pub struct MockGuestStore {
    guests: Mutex<HashMap<String, GuestRecord>>,
}

impl MockGuestStore {
    /// Create a new empty MockGuestStore
    pub fn new() -> Self {
        Self {
            guests: Mutex::new(HashMap::new()),
        }
    }

    /// Create a MockGuestStore with initial test data
    pub fn with_data(guests: Vec<GuestRecord>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.guests.lock().unwrap();
            for guest in guests {
                stored.insert(guest.id.clone(), guest);
            }
        }
        store
    }

    /// Snapshot of a stored guest, for asserting on store state
    pub fn get(&self, id: &str) -> Option<GuestRecord> {
        self.guests.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.guests.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MockGuestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuestStore for MockGuestStore {
    async fn create_guest(&self, guest: GuestRecord) -> Result<GuestRecord> {
        let mut guests = self.guests.lock().unwrap();

        if guests.contains_key(&guest.id) {
            return Err(ServiceError::ValidationError(format!(
                "Guest with ID {} already exists",
                guest.id
            )));
        }

        if guests
            .values()
            .any(|existing| existing.serial_number == guest.serial_number)
        {
            return Err(ServiceError::ValidationError(format!(
                "Serial number {} is already assigned to another guest",
                guest.serial_number
            )));
        }

        guests.insert(guest.id.clone(), guest.clone());
        Ok(guest)
    }

    async fn find_guests(&self, filter: &DocumentFilter) -> Result<Vec<GuestRecord>> {
        let guests: Vec<GuestRecord> = self.guests.lock().unwrap().values().cloned().collect();
        filter.select(guests)
    }

    async fn update_guest(&self, id: &str, patch: &GuestPatch) -> Result<GuestRecord> {
        let mut guests = self.guests.lock().unwrap();

        let current = guests
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Guest not found: {}", id)))?;

        if let Some(serial_number) = patch.serial_number.as_value() {
            let taken = guests
                .values()
                .any(|other| other.id != id && other.serial_number == *serial_number);
            if taken {
                return Err(ServiceError::ValidationError(format!(
                    "Serial number {} is already assigned to another guest",
                    serial_number
                )));
            }
        }

        let updated = patch.apply_to(current)?;
        guests.insert(id.to_string(), updated.clone());
        Ok(updated)
    }
}
