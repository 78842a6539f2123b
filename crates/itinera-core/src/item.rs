use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Flight,
    Hotel,
    Transfer,
    Restaurant,
    Activity,
}

impl ItemType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
            Self::Transfer => "transfer",
            Self::Restaurant => "restaurant",
            Self::Activity => "activity",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flight" => Ok(Self::Flight),
            "hotel" => Ok(Self::Hotel),
            "transfer" => Ok(Self::Transfer),
            "restaurant" => Ok(Self::Restaurant),
            "activity" => Ok(Self::Activity),
            _ => Err(crate::Error::InvalidItemType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightData {
    pub flight_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    /// Carrier IATA code confirmed by the schedule provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_class: Option<String>,
    #[serde(default)]
    pub enriched: bool,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_notes: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum ItemDetails {
    Flight(FlightData),
    Hotel(HotelData),
    Transfer(TransferData),
    Restaurant(RestaurantData),
    Activity(ActivityData),
}

impl ItemDetails {
    #[must_use]
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

/// An itinerary entry produced during a batch run and not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub title: String,
    pub description: Option<String>,
    pub info: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub origin_place_id: Option<Uuid>,
    pub destination_place_id: Option<Uuid>,
    pub origin_location_detail: Option<String>,
    pub destination_location_detail: Option<String>,
    pub confirmation_number: Option<String>,
    pub client_arranged: bool,
    pub details: ItemDetails,
}

impl ItemDraft {
    #[must_use]
    pub fn new(title: String, details: ItemDetails) -> Self {
        Self {
            title,
            description: None,
            info: None,
            start_time: None,
            end_time: None,
            origin_place_id: None,
            destination_place_id: None,
            origin_location_detail: None,
            destination_location_detail: None,
            confirmation_number: None,
            client_arranged: false,
            details,
        }
    }

    #[must_use]
    pub fn item_type(&self) -> ItemType {
        self.details.item_type()
    }

    #[must_use]
    pub fn with_times(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    #[must_use]
    pub fn into_item(self, trip_id: Uuid, document_id: Option<Uuid>) -> Item {
        Item {
            id: Uuid::now_v7(),
            trip_id,
            document_id,
            title: self.title,
            description: self.description,
            info: self.info,
            start_time: self.start_time,
            end_time: self.end_time,
            origin_place_id: self.origin_place_id,
            destination_place_id: self.destination_place_id,
            origin_location_detail: self.origin_location_detail,
            destination_location_detail: self.destination_location_detail,
            confirmation_number: self.confirmation_number,
            client_arranged: self.client_arranged,
            details: self.details,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub document_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub info: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub origin_place_id: Option<Uuid>,
    pub destination_place_id: Option<Uuid>,
    pub origin_location_detail: Option<String>,
    pub destination_location_detail: Option<String>,
    pub confirmation_number: Option<String>,
    pub client_arranged: bool,
    pub details: ItemDetails,
    pub created_at: DateTime<Utc>,
}

impl Item {
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        self.details.item_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_tag_matches_type() {
        let details = ItemDetails::Transfer(TransferData::default());
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["type"], "transfer");

        let back: ItemDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back.item_type(), ItemType::Transfer);
    }

    #[test]
    fn test_extra_omitted_when_null() {
        let data = HotelData {
            hotel_name: Some("Hotel Borg".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("extra").is_none());
        assert!(json.get("room_type").is_none());
    }

    #[test]
    fn test_draft_into_item_keeps_fields() {
        let trip_id = Uuid::now_v7();
        let mut draft = ItemDraft::new(
            "Hotel Stay".into(),
            ItemDetails::Hotel(HotelData::default()),
        );
        draft.confirmation_number = Some("ABC123".into());

        let item = draft.into_item(trip_id, None);

        assert_eq!(item.trip_id, trip_id);
        assert_eq!(item.item_type(), ItemType::Hotel);
        assert_eq!(item.confirmation_number.as_deref(), Some("ABC123"));
        assert!(!item.client_arranged);
    }

    #[test]
    fn test_item_type_from_str() {
        assert_eq!("flight".parse::<ItemType>().unwrap(), ItemType::Flight);
        assert!("cruise".parse::<ItemType>().is_err());
    }
}
