use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Result, ServiceError};

pub mod notification;

pub use notification::NotificationLogEntry;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "serialNo", deserialize_with = "deserialize_serial_number")]
    pub serial_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(default, alias = "holud", skip_serializing_if = "Option::is_none")]
    pub holud_amount: Option<Amount>,
    #[serde(default, alias = "wedding", skip_serializing_if = "Option::is_none")]
    pub wedding_amount: Option<Amount>,
    #[serde(default, alias = "reception", skip_serializing_if = "Option::is_none")]
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

impl GuestRecord {
    /// JSON document form used by filters and patches
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Contribution amount. Older imports stored these as text, so a numeric
/// string is accepted on input; output is always a JSON number.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Amount(pub f64);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number or a numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Amount, E> {
                Ok(Amount(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Amount, E> {
                Ok(Amount(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Amount, E> {
                if v.is_finite() {
                    Ok(Amount(v))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Amount, E> {
                match v.trim().parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() => Ok(Amount(parsed)),
                    _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

// Serial numbers are typed into text inputs, so "42" arrives as a string
struct SerialNumber(i64);

impl<'de> Deserialize<'de> for SerialNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SerialNumberVisitor;

        impl<'de> Visitor<'de> for SerialNumberVisitor {
            type Value = SerialNumber;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer or an integer string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<SerialNumber, E> {
                Ok(SerialNumber(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<SerialNumber, E> {
                i64::try_from(v)
                    .map(SerialNumber)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<SerialNumber, E> {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Ok(SerialNumber(v as i64))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<SerialNumber, E> {
                v.trim()
                    .parse::<i64>()
                    .map(SerialNumber)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(SerialNumberVisitor)
    }
}

/// Reads a serial number from an integer or an integer string
pub fn deserialize_serial_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    SerialNumber::deserialize(deserializer).map(|serial| serial.0)
}

fn deserialize_nullable_serial_number<'de, D>(
    deserializer: D,
) -> std::result::Result<NullableField<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<SerialNumber>::deserialize(deserializer)? {
        Some(serial) => NullableField::Value(serial.0),
        None => NullableField::Null,
    })
}

// Helper for null vs. not-present in JSON
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NullableField<T> {
    Null,
    Value(T),
    #[serde(skip_deserializing)]
    NotPresent,
}

impl<T> Default for NullableField<T> {
    fn default() -> Self {
        NullableField::NotPresent
    }
}

impl<T> NullableField<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            NullableField::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn was_present(&self) -> bool {
        !matches!(self, NullableField::NotPresent)
    }
}

/// One field assignment derived from a patch. `None` clears the field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub value: Option<Value>,
}

/// Partial update for a guest. Fields absent from the request body are left
/// untouched; unknown fields are ignored.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GuestPatch {
    #[serde(default)]
    pub name: NullableField<String>,
    #[serde(
        default,
        alias = "serialNo",
        deserialize_with = "deserialize_nullable_serial_number"
    )]
    pub serial_number: NullableField<i64>,
    #[serde(default)]
    pub reference: NullableField<String>,
    #[serde(default)]
    pub location: NullableField<String>,
    #[serde(default)]
    pub telephone: NullableField<String>,
    #[serde(default, alias = "holud")]
    pub holud_amount: NullableField<Amount>,
    #[serde(default, alias = "wedding")]
    pub wedding_amount: NullableField<Amount>,
    #[serde(default, alias = "reception")]
    pub reception_amount: NullableField<Amount>,
    #[serde(default)]
    pub invited: NullableField<bool>,
    #[serde(default)]
    pub invited_holud: NullableField<bool>,
    #[serde(default)]
    pub invited_wedding: NullableField<bool>,
    #[serde(default)]
    pub invited_reception: NullableField<bool>,
}

impl GuestPatch {
    /// Rejects patches that would break a required field
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            NullableField::Null => {
                return Err(ServiceError::ValidationError("name cannot be null".into()))
            }
            NullableField::Value(name) if name.trim().is_empty() => {
                return Err(ServiceError::ValidationError(
                    "name must not be empty".into(),
                ))
            }
            _ => {}
        }

        let required = [
            ("serialNumber", self.serial_number == NullableField::Null),
            ("invited", self.invited == NullableField::Null),
            ("invitedHolud", self.invited_holud == NullableField::Null),
            ("invitedWedding", self.invited_wedding == NullableField::Null),
            ("invitedReception", self.invited_reception == NullableField::Null),
        ];
        if let Some((field, _)) = required.iter().find(|(_, is_null)| *is_null) {
            return Err(ServiceError::ValidationError(format!(
                "{} cannot be null",
                field
            )));
        }

        Ok(())
    }

    /// Every field the patch touches, keyed by its stored attribute name
    pub fn changes(&self) -> Result<Vec<FieldChange>> {
        let mut changes = Vec::new();
        let name = match &self.name {
            NullableField::Value(name) => NullableField::Value(name.trim().to_string()),
            other => other.clone(),
        };
        push_change(&mut changes, "name", &name)?;
        push_change(&mut changes, "serialNumber", &self.serial_number)?;
        push_change(&mut changes, "reference", &self.reference)?;
        push_change(&mut changes, "location", &self.location)?;
        push_change(&mut changes, "telephone", &self.telephone)?;
        push_change(&mut changes, "holudAmount", &self.holud_amount)?;
        push_change(&mut changes, "weddingAmount", &self.wedding_amount)?;
        push_change(&mut changes, "receptionAmount", &self.reception_amount)?;
        push_change(&mut changes, "invited", &self.invited)?;
        push_change(&mut changes, "invitedHolud", &self.invited_holud)?;
        push_change(&mut changes, "invitedWedding", &self.invited_wedding)?;
        push_change(&mut changes, "invitedReception", &self.invited_reception)?;
        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        !(self.name.was_present()
            || self.serial_number.was_present()
            || self.reference.was_present()
            || self.location.was_present()
            || self.telephone.was_present()
            || self.holud_amount.was_present()
            || self.wedding_amount.was_present()
            || self.reception_amount.was_present()
            || self.invited.was_present()
            || self.invited_holud.was_present()
            || self.invited_wedding.was_present()
            || self.invited_reception.was_present())
    }

    /// Returns a copy of `guest` with every change applied as a whole-field replacement
    pub fn apply_to(&self, guest: &GuestRecord) -> Result<GuestRecord> {
        let mut document = match guest.to_document()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for change in self.changes()? {
            match change.value {
                Some(value) => {
                    document.insert(change.field.to_string(), value);
                }
                None => {
                    document.remove(change.field);
                }
            }
        }

        Ok(serde_json::from_value(Value::Object(document))?)
    }
}

fn push_change<T: Serialize>(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    value: &NullableField<T>,
) -> Result<()> {
    match value {
        NullableField::NotPresent => {}
        NullableField::Null => changes.push(FieldChange { field, value: None }),
        NullableField::Value(v) => changes.push(FieldChange {
            field,
            value: Some(serde_json::to_value(v)?),
        }),
    }
    Ok(())
}
