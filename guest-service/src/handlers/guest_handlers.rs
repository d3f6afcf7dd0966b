use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use log::{debug, info};
use std::sync::Arc;

use crate::error::{AppError, Result, StoreResultExt};
use crate::models::{
    parse_json_body, parse_required_json_body, CardsQuery, CreateGuestRequest,
    RawGuestQueryRequest, UpdateGuestRequest,
};
use crate::state::AppState;
use guestlist_shared::filter::{DocumentFilter, GuestSearch};
use guestlist_shared::models::GuestRecord;
use guestlist_shared::store::{with_timeout, GuestStore, NotificationLogStore};

// POST /getAllGuests
pub async fn get_all_guests<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    body: Bytes,
) -> Result<Json<Vec<GuestRecord>>>
where
    G: GuestStore,
    N: NotificationLogStore,
{
    const FAILURE: &str = "Failed to fetch guests";
    state.require_raw_filters()?;

    let request: RawGuestQueryRequest = parse_json_body(&body)?;
    debug!("Raw guest query: {}", request.query);
    let filter = DocumentFilter::parse(&request.query).or_fail_with(FAILURE)?;

    let guests = with_timeout(
        state.store_timeout,
        "find_guests",
        state.guests.find_guests(&filter),
    )
    .await
    .or_fail_with(FAILURE)?;

    info!("Raw guest query matched {} guests", guests.len());
    Ok(Json(guests))
}

// GET /api/cards
pub async fn search_cards<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    query: std::result::Result<Query<CardsQuery>, QueryRejection>,
) -> Result<Json<Vec<GuestRecord>>>
where
    G: GuestStore,
    N: NotificationLogStore,
{
    const FAILURE: &str = "Failed to fetch cards";
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let search = GuestSearch::from(query);
    debug!("Card search: {:?}", search);
    let filter = search.to_filter().or_fail_with(FAILURE)?;

    let guests = with_timeout(
        state.store_timeout,
        "find_guests",
        state.guests.find_guests(&filter),
    )
    .await
    .or_fail_with(FAILURE)?;

    info!("Card search returned {} guests", guests.len());
    Ok(Json(guests))
}

// PUT /update/card
pub async fn update_card<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    body: Bytes,
) -> Result<Json<GuestRecord>>
where
    G: GuestStore,
    N: NotificationLogStore,
{
    const FAILURE: &str = "Failed to update card";
    let request: UpdateGuestRequest = parse_required_json_body(&body)?;

    let id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("id is required".into()))?;
    request.patch.validate().or_fail_with(FAILURE)?;

    info!("Updating guest {}", id);
    let updated = with_timeout(
        state.store_timeout,
        "update_guest",
        state.guests.update_guest(&id, &request.patch),
    )
    .await
    .or_fail_with(FAILURE)?;

    Ok(Json(updated))
}

// POST /guests
pub async fn create_guest<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<GuestRecord>)>
where
    G: GuestStore,
    N: NotificationLogStore,
{
    let request: CreateGuestRequest = parse_required_json_body(&body)?;
    let record = request.into_record()?;

    info!(
        "Creating guest {} with serial number {}",
        record.id, record.serial_number
    );
    let created = with_timeout(
        state.store_timeout,
        "create_guest",
        state.guests.create_guest(record),
    )
    .await
    .or_fail_with("Failed to create guest")?;

    Ok((StatusCode::CREATED, Json(created)))
}
