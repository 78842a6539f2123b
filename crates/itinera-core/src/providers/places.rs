use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{client_error, read_json, AddressComponent, PlaceCandidate, PlaceSearch, ProviderResult};
use crate::network::{join_url, ProviderClient};

const PROVIDER: &str = "google_places";

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.addressComponents,places.location,places.utcOffsetMinutes";

/// Google Places text search.
pub struct GooglePlacesSearch {
    client: ProviderClient,
    api_key: String,
    base_url: String,
}

impl GooglePlacesSearch {
    pub fn new(client: ProviderClient, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    text_query: &'a str,
    max_result_count: u8,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    places: Vec<ResponsePlace>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePlace {
    id: Option<String>,
    display_name: Option<ResponseText>,
    formatted_address: Option<String>,
    #[serde(default)]
    address_components: Vec<ResponseComponent>,
    location: Option<ResponseLocation>,
    utc_offset_minutes: Option<i32>,
}

#[derive(Deserialize)]
struct ResponseText {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseComponent {
    #[serde(default)]
    long_text: String,
    #[serde(default)]
    short_text: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize)]
struct ResponseLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ResponsePlace {
    fn into_candidate(self) -> Option<PlaceCandidate> {
        let external_id = self.id?;
        let name = self.display_name.and_then(|t| t.text)?;

        Some(PlaceCandidate {
            external_id,
            name,
            formatted_address: self.formatted_address,
            components: self
                .address_components
                .into_iter()
                .map(|c| AddressComponent {
                    long_text: c.long_text,
                    short_text: c.short_text,
                    types: c.types,
                })
                .collect(),
            latitude: self.location.as_ref().and_then(|l| l.latitude),
            longitude: self.location.as_ref().and_then(|l| l.longitude),
            utc_offset_minutes: self.utc_offset_minutes,
        })
    }
}

#[async_trait::async_trait]
impl PlaceSearch for GooglePlacesSearch {
    async fn search(&self, query: &str) -> ProviderResult<Vec<PlaceCandidate>> {
        debug!(query, "searching places");

        let body = SearchRequest {
            text_query: query,
            max_result_count: 5,
        };

        let request = self
            .client
            .post(&join_url(&self.base_url, "places:searchText"))
            .map_err(client_error(PROVIDER))?
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body);

        let response: SearchResponse = read_json(PROVIDER, request).await?;

        Ok(response
            .places
            .into_iter()
            .filter_map(ResponsePlace::into_candidate)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_mapping() {
        let raw = r#"{
            "places": [
                {
                    "id": "ChIJ123",
                    "displayName": {"text": "The Ritz-Carlton, New York", "languageCode": "en"},
                    "formattedAddress": "50 Central Park S, New York, NY 10019, USA",
                    "addressComponents": [
                        {"longText": "New York", "shortText": "New York", "types": ["locality", "political"]},
                        {"longText": "New York", "shortText": "NY", "types": ["administrative_area_level_1"]}
                    ],
                    "location": {"latitude": 40.765, "longitude": -73.976},
                    "utcOffsetMinutes": -240
                },
                {"displayName": {"text": "No id"}}
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let candidates: Vec<_> = response
            .places
            .into_iter()
            .filter_map(ResponsePlace::into_candidate)
            .collect();

        assert_eq!(candidates.len(), 1);
        let ritz = &candidates[0];
        assert_eq!(ritz.external_id, "ChIJ123");
        assert_eq!(ritz.utc_offset_minutes, Some(-240));
        assert_eq!(ritz.components.len(), 2);
        assert_eq!(ritz.components[1].short_text, "NY");
        assert_eq!(ritz.latitude, Some(40.765));
    }

    #[test]
    fn test_empty_response() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.places.is_empty());
    }
}
