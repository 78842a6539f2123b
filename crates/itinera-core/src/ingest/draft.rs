//! Records as the extraction collaborator emits them.
//!
//! Every field is optional and the model is loose about types, so strings
//! also accept numbers and booleans, and blank strings read as absent.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::item::ItemType;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("record has no type tag")]
    MissingType,
    #[error("unknown record type: {0}")]
    UnknownType(String),
    #[error("record is not an object")]
    NotAnObject,
    #[error("invalid {item_type} record: {source}")]
    Invalid {
        item_type: ItemType,
        #[source]
        source: serde_json::Error,
    },
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

/// Fields shared by every record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonFields {
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub confirmation_number: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub client_arranged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFlight {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(deserialize_with = "lenient_string")]
    pub flight_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub airline: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub departure_airport: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub arrival_airport: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub departure_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub arrival_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub departure_terminal: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub arrival_terminal: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub seat: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cabin_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawHotel {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(deserialize_with = "lenient_string")]
    pub hotel_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub check_in_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub check_out_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub room_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub guest_count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTransfer {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub contact_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub contact_phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub pickup_location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dropoff_location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub pickup_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dropoff_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRestaurant {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(deserialize_with = "lenient_string")]
    pub restaurant_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub reservation_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub party_size: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dietary_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawActivity {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(deserialize_with = "lenient_string")]
    pub activity_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub operator: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub start_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDraft {
    Flight(RawFlight),
    Hotel(RawHotel),
    Transfer(RawTransfer),
    Restaurant(RawRestaurant),
    Activity(RawActivity),
}

impl RawDraft {
    /// Reads one extracted record, dispatching on its `type` tag.
    pub fn from_value(value: Value) -> Result<Self, DraftError> {
        let tag = match &value {
            Value::Object(map) => map
                .get("type")
                .and_then(Value::as_str)
                .map(|t| t.trim().to_ascii_lowercase())
                .ok_or(DraftError::MissingType)?,
            _ => return Err(DraftError::NotAnObject),
        };

        let item_type: ItemType = tag
            .parse()
            .map_err(|_| DraftError::UnknownType(tag.clone()))?;
        let invalid = |source| DraftError::Invalid { item_type, source };

        Ok(match item_type {
            ItemType::Flight => Self::Flight(serde_json::from_value(value).map_err(invalid)?),
            ItemType::Hotel => Self::Hotel(serde_json::from_value(value).map_err(invalid)?),
            ItemType::Transfer => Self::Transfer(serde_json::from_value(value).map_err(invalid)?),
            ItemType::Restaurant => {
                Self::Restaurant(serde_json::from_value(value).map_err(invalid)?)
            }
            ItemType::Activity => Self::Activity(serde_json::from_value(value).map_err(invalid)?),
        })
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Flight(_) => ItemType::Flight,
            Self::Hotel(_) => ItemType::Hotel,
            Self::Transfer(_) => ItemType::Transfer,
            Self::Restaurant(_) => ItemType::Restaurant,
            Self::Activity(_) => ItemType::Activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flight_record() {
        let draft = RawDraft::from_value(json!({
            "type": "flight",
            "title": "Flight FI 614",
            "flightNumber": "FI 614",
            "departureAirport": "KEF",
            "arrivalAirport": "JFK",
            "departureTime": "2024-06-01T16:40",
            "clientArranged": "yes"
        }))
        .unwrap();

        let RawDraft::Flight(flight) = draft else {
            panic!("expected flight");
        };
        assert_eq!(flight.flight_number.as_deref(), Some("FI 614"));
        assert_eq!(flight.common.title.as_deref(), Some("Flight FI 614"));
        assert!(flight.common.client_arranged);
        assert!(flight.seat.is_none());
    }

    #[test]
    fn test_lenient_values() {
        let draft = RawDraft::from_value(json!({
            "type": "Hotel",
            "hotelName": "  ",
            "guestCount": 2,
            "confirmationNumber": 884213,
            "roomType": null
        }))
        .unwrap();

        let RawDraft::Hotel(hotel) = draft else {
            panic!("expected hotel");
        };
        assert!(hotel.hotel_name.is_none());
        assert_eq!(hotel.guest_count.as_deref(), Some("2"));
        assert_eq!(hotel.common.confirmation_number.as_deref(), Some("884213"));
        assert!(!hotel.common.client_arranged);
    }

    #[test]
    fn test_unknown_and_missing_type() {
        assert!(matches!(
            RawDraft::from_value(json!({"type": "cruise"})),
            Err(DraftError::UnknownType(t)) if t == "cruise"
        ));
        assert!(matches!(
            RawDraft::from_value(json!({"hotelName": "Borg"})),
            Err(DraftError::MissingType)
        ));
        assert!(matches!(
            RawDraft::from_value(json!("hotel")),
            Err(DraftError::NotAnObject)
        ));
    }

    #[test]
    fn test_item_type() {
        let draft = RawDraft::from_value(json!({"type": "transfer"})).unwrap();
        assert_eq!(draft.item_type(), ItemType::Transfer);
    }
}
