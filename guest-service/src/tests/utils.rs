use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::routes::create_router_with_state;
use crate::state::AppState;
use guestlist_shared::error::{Result, ServiceError};
use guestlist_shared::filter::DocumentFilter;
use guestlist_shared::models::{Amount, GuestPatch, GuestRecord};
use guestlist_shared::store::GuestStore;
use guestlist_shared::test_utils::mock_guest_store::MockGuestStore;
use guestlist_shared::test_utils::mock_notification_store::MockNotificationLogStore;
use guestlist_shared::test_utils::test_logging::init_test_logging;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Router plus handles on the stores behind it
pub struct TestApp {
    pub router: Router,
    pub guests: Arc<MockGuestStore>,
    pub messages: Arc<MockNotificationLogStore>,
}

pub fn guest(id: &str, name: &str, serial_number: i64) -> GuestRecord {
    GuestRecord {
        id: id.to_string(),
        name: name.to_string(),
        serial_number,
        reference: None,
        location: None,
        telephone: None,
        holud_amount: None,
        wedding_amount: None,
        reception_amount: None,
        invited: false,
        invited_holud: false,
        invited_wedding: false,
        invited_reception: false,
    }
}

pub fn create_test_guests() -> Vec<GuestRecord> {
    let mut amina = guest("g-1", "Amina Karim", 1);
    amina.reference = Some("Bride's family".into());
    amina.location = Some("Dhaka".into());
    amina.telephone = Some("01711000001".into());
    amina.holud_amount = Some(Amount(1000.0));
    amina.invited = true;

    let mut faruk = guest("g-2", "Faruk Hossain", 2);
    faruk.reference = Some("Amirul".into());
    faruk.wedding_amount = Some(Amount(500.0));

    let mut nadia = guest("g-3", "Nadia Rahman", 3);
    nadia.location = Some("Chittagong".into());
    nadia.invited = true;
    nadia.invited_holud = true;

    let rafiq = guest("g-4", "Rafiq", 10);

    vec![amina, faruk, nadia, rafiq]
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(true, MockNotificationLogStore::new())
}

pub fn create_test_app_with(allow_raw_filters: bool, messages: MockNotificationLogStore) -> TestApp {
    init_test_logging();

    let guests = Arc::new(MockGuestStore::with_data(create_test_guests()));
    let messages = Arc::new(messages);
    let state = AppState::new(guests.clone(), messages.clone(), TEST_TIMEOUT)
        .with_raw_filters(allow_raw_filters);

    TestApp {
        router: create_router_with_state(state, ""),
        guests,
        messages,
    }
}

/// Router over a guest store that is not the in-memory mock
pub fn create_test_app_with_guest_store<G: GuestStore>(store: G) -> Router {
    init_test_logging();

    let state = AppState::new(
        Arc::new(store),
        Arc::new(MockNotificationLogStore::new()),
        TEST_TIMEOUT,
    );
    create_router_with_state(state, "")
}

/// Guest store whose backend is unreachable
pub struct UnavailableGuestStore;

#[async_trait]
impl GuestStore for UnavailableGuestStore {
    async fn create_guest(&self, _guest: GuestRecord) -> Result<GuestRecord> {
        Err(ServiceError::StoreUnavailable("connection refused".into()))
    }

    async fn find_guests(&self, _filter: &DocumentFilter) -> Result<Vec<GuestRecord>> {
        Err(ServiceError::StoreUnavailable("connection refused".into()))
    }

    async fn update_guest(&self, _id: &str, _patch: &GuestPatch) -> Result<GuestRecord> {
        Err(ServiceError::StoreUnavailable("connection refused".into()))
    }
}

/// Guest store that never answers within the request timeout
pub struct StalledGuestStore;

impl StalledGuestStore {
    async fn stall() {
        tokio::time::sleep(TEST_TIMEOUT * 10).await;
    }
}

#[async_trait]
impl GuestStore for StalledGuestStore {
    async fn create_guest(&self, guest: GuestRecord) -> Result<GuestRecord> {
        Self::stall().await;
        Ok(guest)
    }

    async fn find_guests(&self, _filter: &DocumentFilter) -> Result<Vec<GuestRecord>> {
        Self::stall().await;
        Ok(Vec::new())
    }

    async fn update_guest(&self, id: &str, _patch: &GuestPatch) -> Result<GuestRecord> {
        Self::stall().await;
        Err(ServiceError::NotFound(id.to_string()))
    }
}
