use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    Airport,
    Hotel,
    Restaurant,
    Venue,
    Attraction,
}

impl PlaceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airport => "airport",
            Self::Hotel => "hotel",
            Self::Restaurant => "restaurant",
            Self::Venue => "venue",
            Self::Attraction => "attraction",
        }
    }
}

impl std::fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlaceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airport" => Ok(Self::Airport),
            "hotel" => Ok(Self::Hotel),
            "restaurant" => Ok(Self::Restaurant),
            "venue" => Ok(Self::Venue),
            "attraction" => Ok(Self::Attraction),
            _ => Err(crate::Error::InvalidPlaceKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

/// Location attributes stored alongside the indexed place columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub address: PlaceAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Either a `"+HH:MM"` offset or an IANA zone name, whichever the provider gave.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    pub short_code: Option<String>,
    pub kind: PlaceKind,
    pub external_id: Option<String>,
    pub details: PlaceDetails,
    pub created_at: DateTime<Utc>,
}

impl Place {
    /// A place carrying only its name and kind, used when no provider data exists.
    #[must_use]
    pub fn bare(name: String, kind: PlaceKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            short_code: None,
            kind,
            external_id: None,
            details: PlaceDetails::default(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_short_code(mut self, code: impl Into<String>) -> Self {
        self.short_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: PlaceDetails) -> Self {
        self.details = details;
        self
    }
}

/// Formats a UTC offset in minutes as `"+HH:MM"` / `"-HH:MM"`.
#[must_use]
pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}
