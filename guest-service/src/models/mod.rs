use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use guestlist_shared::filter::{FlagFilter, GuestSearch, StatusFilter};
use guestlist_shared::models::{deserialize_serial_number, Amount, GuestPatch, GuestRecord};

// Request DTOs

/// Query string of `GET /api/cards`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardsQuery {
    pub search_query: Option<String>,
    #[serde(default)]
    pub filter_status: StatusFilter,
    #[serde(default)]
    pub invited_holud: FlagFilter,
    #[serde(default)]
    pub invited_wedding: FlagFilter,
    #[serde(default)]
    pub invited_reception: FlagFilter,
}

impl From<CardsQuery> for GuestSearch {
    fn from(query: CardsQuery) -> Self {
        GuestSearch {
            term: query.search_query,
            status: query.filter_status,
            holud: query.invited_holud,
            wedding: query.invited_wedding,
            reception: query.invited_reception,
        }
    }
}

/// Body of `POST /getAllGuests`
#[derive(Deserialize, Debug, Default)]
pub struct RawGuestQueryRequest {
    #[serde(default)]
    pub query: Value,
}

/// Body of `PUT /update/card`: the guest id plus the fields to change
#[derive(Deserialize, Debug)]
pub struct UpdateGuestRequest {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub patch: GuestPatch,
}

/// Body of `POST /guests`. Any `id` sent by the caller is ignored.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestRequest {
    pub name: String,
    #[serde(alias = "serialNo", deserialize_with = "deserialize_serial_number")]
    pub serial_number: i64,
    pub reference: Option<String>,
    pub location: Option<String>,
    pub telephone: Option<String>,
    #[serde(alias = "holud")]
    pub holud_amount: Option<Amount>,
    #[serde(alias = "wedding")]
    pub wedding_amount: Option<Amount>,
    #[serde(alias = "reception")]
    pub reception_amount: Option<Amount>,
    #[serde(default)]
    pub invited: bool,
    #[serde(default)]
    pub invited_holud: bool,
    #[serde(default)]
    pub invited_wedding: bool,
    #[serde(default)]
    pub invited_reception: bool,
}

impl CreateGuestRequest {
    pub fn into_record(self) -> Result<GuestRecord, AppError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }

        Ok(GuestRecord {
            id: Uuid::new_v4().to_string(),
            name,
            serial_number: self.serial_number,
            reference: self.reference,
            location: self.location,
            telephone: self.telephone,
            holud_amount: self.holud_amount,
            wedding_amount: self.wedding_amount,
            reception_amount: self.reception_amount,
            invited: self.invited,
            invited_holud: self.invited_holud,
            invited_wedding: self.invited_wedding,
            invited_reception: self.invited_reception,
        })
    }
}

/// Parses a JSON request body. Clients send these routes without a
/// content type and sometimes with no body at all, so an empty body
/// yields the default value.
pub fn parse_json_body<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required_json_body(body)
}

pub fn parse_required_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("Request body is required".into()));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}
