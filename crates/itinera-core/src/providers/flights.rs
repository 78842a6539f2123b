use serde::Deserialize;
use tracing::debug;

use super::{
    client_error, send, FlightInstance, FlightPoint, FlightSchedule, ProviderError,
    ProviderResult, ScheduleQuery,
};
use crate::network::{join_url, ProviderClient};

const PROVIDER: &str = "flight_schedule";

/// AeroDataBox flight-by-number lookup over RapidAPI.
pub struct AeroDataBoxSchedule {
    client: ProviderClient,
    api_key: String,
    base_url: String,
    host: String,
}

impl AeroDataBoxSchedule {
    pub fn new(client: ProviderClient, api_key: String, base_url: String, host: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
            host,
        }
    }

    fn path_for(query: &ScheduleQuery) -> (String, Option<&'static str>) {
        let flight = query.flight_number();
        match (query.departure_date, query.arrival_date) {
            (Some(date), _) => (
                format!("flights/number/{flight}/{}", date.format("%Y-%m-%d")),
                Some("Departure"),
            ),
            (None, Some(date)) => (
                format!("flights/number/{flight}/{}", date.format("%Y-%m-%d")),
                Some("Arrival"),
            ),
            (None, None) => (format!("flights/number/{flight}"), None),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseFlight {
    departure: Option<ResponseMovement>,
    arrival: Option<ResponseMovement>,
    airline: Option<ResponseAirline>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseMovement {
    airport: Option<ResponseAirport>,
    scheduled_time: Option<ResponseTime>,
    terminal: Option<String>,
}

#[derive(Deserialize)]
struct ResponseAirport {
    iata: Option<String>,
}

#[derive(Deserialize)]
struct ResponseTime {
    local: Option<String>,
}

#[derive(Deserialize)]
struct ResponseAirline {
    iata: Option<String>,
}

impl ResponseMovement {
    fn into_point(self) -> FlightPoint {
        FlightPoint {
            airport_iata: self.airport.and_then(|a| a.iata),
            local_time: self.scheduled_time.and_then(|t| t.local),
            terminal: self.terminal.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl ResponseFlight {
    fn into_instance(self) -> FlightInstance {
        FlightInstance {
            carrier_iata: self.airline.and_then(|a| a.iata),
            departure: self.departure.map(ResponseMovement::into_point).unwrap_or_default(),
            arrival: self.arrival.map(ResponseMovement::into_point).unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl FlightSchedule for AeroDataBoxSchedule {
    async fn lookup(&self, query: &ScheduleQuery) -> ProviderResult<Vec<FlightInstance>> {
        let (path, role) = Self::path_for(query);
        debug!(path = %path, "looking up flight schedule");

        let mut request = self
            .client
            .get(&join_url(&self.base_url, &path))
            .map_err(client_error(PROVIDER))?
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host);
        if let Some(role) = role {
            request = request.query(&[("dateLocalRole", role)]);
        }

        // 204 means no flight on that date
        let response = send(PROVIDER, request).await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let flights: Vec<ResponseFlight> =
            response.json().await.map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(flights.into_iter().map(ResponseFlight::into_instance).collect())
    }
}
