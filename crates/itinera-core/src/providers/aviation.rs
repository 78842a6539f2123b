use serde::Deserialize;
use tracing::debug;

use super::{client_error, read_json, AirportRecord, AviationData, ProviderResult};
use crate::network::{join_url, ProviderClient};

const PROVIDER: &str = "aviation";

/// Airport lookup by IATA code against the API-Ninjas airports endpoint.
pub struct ApiNinjasAviation {
    client: ProviderClient,
    api_key: String,
    base_url: String,
}

impl ApiNinjasAviation {
    pub fn new(client: ProviderClient, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct ResponseAirport {
    #[serde(default)]
    iata: String,
    #[serde(default)]
    name: String,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    latitude: Option<serde_json::Value>,
    longitude: Option<serde_json::Value>,
    timezone: Option<String>,
}

impl ResponseAirport {
    fn into_record(self) -> AirportRecord {
        AirportRecord {
            iata: self.iata,
            name: self.name,
            city: non_empty(self.city),
            state: non_empty(self.region),
            country: non_empty(self.country),
            latitude: self.latitude.as_ref().and_then(coordinate),
            longitude: self.longitude.as_ref().and_then(coordinate),
            timezone: non_empty(self.timezone),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The endpoint reports coordinates as strings.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pick_airport(iata: &str, airports: Vec<ResponseAirport>) -> Option<AirportRecord> {
    airports
        .into_iter()
        .find(|a| a.iata.eq_ignore_ascii_case(iata) && !a.name.is_empty())
        .map(ResponseAirport::into_record)
}

#[async_trait::async_trait]
impl AviationData for ApiNinjasAviation {
    async fn airport(&self, iata: &str) -> ProviderResult<Option<AirportRecord>> {
        debug!(iata, "looking up airport");

        let request = self
            .client
            .get(&join_url(&self.base_url, "airports"))
            .map_err(client_error(PROVIDER))?
            .header("X-Api-Key", &self.api_key)
            .query(&[("iata", iata)]);

        let airports: Vec<ResponseAirport> = read_json(PROVIDER, request).await?;

        Ok(pick_airport(iata, airports))
    }
}
