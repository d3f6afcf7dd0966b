use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// One inbound webhook call, stored verbatim
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl NotificationLogEntry {
    /// Builds an entry from a webhook body of any shape.
    ///
    /// `event`, `sessionId` and `data` are picked out when present. `timestamp`
    /// may be an RFC 3339 string, a date or date-time without offset (read as
    /// UTC) or epoch milliseconds; anything else falls back to `received_at`.
    pub fn from_webhook(body: &Value, received_at: DateTime<Utc>) -> Self {
        let timestamp = match body.get("timestamp") {
            None | Some(Value::Null) => received_at,
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                log::warn!(
                    "Unrecognised webhook timestamp {}, using arrival time {}",
                    raw,
                    received_at
                );
                received_at
            }),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            event_name: body.get("event").and_then(text_field),
            session_id: body.get("sessionId").and_then(text_field),
            payload: body.get("data").cloned().unwrap_or(Value::Null),
            timestamp,
        }
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_text(s.trim()),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}
