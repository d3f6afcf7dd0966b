use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Result, StoreResultExt};
use crate::models::parse_json_body;
use crate::state::AppState;
use guestlist_shared::filter::DocumentFilter;
use guestlist_shared::models::NotificationLogEntry;
use guestlist_shared::store::{with_timeout, GuestStore, NotificationLogStore};

// POST /webhook
//
// The sender only needs an acknowledgement, so every failure past this
// point is logged and the call still answers 200.
pub async fn receive_webhook<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    body: Bytes,
) -> (StatusCode, &'static str)
where
    G: GuestStore,
    N: NotificationLogStore,
{
    let received_at = Utc::now();
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("Webhook body is not JSON ({}), storing an empty entry", err);
            Value::Null
        }
    };

    let entry = NotificationLogEntry::from_webhook(&payload, received_at);
    info!(
        "Webhook received: event={:?}, session={:?}",
        entry.event_name, entry.session_id
    );

    match with_timeout(
        state.store_timeout,
        "append_entry",
        state.messages.append_entry(entry),
    )
    .await
    {
        Ok(stored) => info!("Stored webhook entry {}", stored.id),
        Err(err) => error!("Failed to store webhook entry: {}", err),
    }

    (StatusCode::OK, "Webhook received")
}

// GET /whastappMessages
pub async fn get_messages<G, N>(
    State(state): State<Arc<AppState<G, N>>>,
    body: Bytes,
) -> Result<Json<Vec<NotificationLogEntry>>>
where
    G: GuestStore,
    N: NotificationLogStore,
{
    const FAILURE: &str = "Failed to fetch messages";
    state.require_raw_filters()?;

    let raw: Value = parse_json_body(&body)?;
    let filter = DocumentFilter::parse(&raw).or_fail_with(FAILURE)?;

    let entries = with_timeout(
        state.store_timeout,
        "find_entries",
        state.messages.find_entries(&filter),
    )
    .await
    .or_fail_with(FAILURE)?;

    info!("Returning {} notification log entries", entries.len());
    Ok(Json(entries))
}
