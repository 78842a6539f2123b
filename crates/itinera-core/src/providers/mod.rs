//! External lookup providers.
//!
//! Each provider is an async trait so the pipeline can run against the HTTP
//! integrations in production and in-process fakes in tests.

mod aviation;
mod flights;
mod openai;
mod places;

use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::network::ClientError;

pub use aviation::ApiNinjasAviation;
pub use flights::AeroDataBoxSchedule;
pub use openai::{OpenAiExtractor, OpenAiKnowledgeIndex};
pub use places::GooglePlacesSearch;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider}: quota exceeded")]
    QuotaExceeded { provider: &'static str },
    #[error("{provider}: credentials rejected")]
    Unauthorized { provider: &'static str },
    #[error("{provider}: HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider}: transport error: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: unexpected response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider}: {source}")]
    Client {
        provider: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn from_status(provider: &'static str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { provider },
            StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
                Self::QuotaExceeded { provider }
            }
            _ => Self::Status {
                provider,
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Quota and credential failures abort a whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. } | Self::Unauthorized { .. })
    }

    /// Transport failures and non-2xx answers other than rejected credentials.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::QuotaExceeded { .. }
        )
    }
}

pub(crate) async fn send(provider: &'static str, request: RequestBuilder) -> ProviderResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(provider, status, body))
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> ProviderResult<T> {
    let response = send(provider, request).await?;
    response.json().await.map_err(|e| ProviderError::Decode {
        provider,
        message: e.to_string(),
    })
}

pub(crate) fn client_error(provider: &'static str) -> impl Fn(ClientError) -> ProviderError {
    move |source| ProviderError::Client { provider, source }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_text: String,
    pub short_text: String,
    pub types: Vec<String>,
}

/// One ranked result from a place-search provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub external_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    pub components: Vec<AddressComponent>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub utc_offset_minutes: Option<i32>,
}

#[async_trait::async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Candidates for a free-text query, best match first.
    async fn search(&self, query: &str) -> ProviderResult<Vec<PlaceCandidate>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub iata: String,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

#[async_trait::async_trait]
pub trait AviationData: Send + Sync {
    /// `Ok(None)` when the provider knows no airport with this code.
    async fn airport(&self, iata: &str) -> ProviderResult<Option<AirportRecord>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQuery {
    pub carrier_code: String,
    pub number: String,
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
}

impl ScheduleQuery {
    pub fn flight_number(&self) -> String {
        format!("{}{}", self.carrier_code, self.number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightPoint {
    pub airport_iata: Option<String>,
    /// Local wall-clock time as reported by the provider, zone suffix allowed.
    pub local_time: Option<String>,
    pub terminal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightInstance {
    pub carrier_iata: Option<String>,
    pub departure: FlightPoint,
    pub arrival: FlightPoint,
}

#[async_trait::async_trait]
pub trait FlightSchedule: Send + Sync {
    /// Scheduled instances of a flight; an empty list is not an error.
    async fn lookup(&self, query: &ScheduleQuery) -> ProviderResult<Vec<FlightInstance>>;
}

/// Per-trip document index the extraction collaborator searches.
#[async_trait::async_trait]
pub trait KnowledgeIndex: Send + Sync {
    async fn create_index(&self, name: &str) -> ProviderResult<String>;

    async fn list_file_names(&self, index_id: &str) -> ProviderResult<Vec<String>>;

    async fn upload_file(&self, index_id: &str, file_name: &str, bytes: Vec<u8>)
        -> ProviderResult<()>;
}

/// Stand-in for a provider whose API key is absent.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

#[async_trait::async_trait]
impl PlaceSearch for Unconfigured {
    async fn search(&self, _query: &str) -> ProviderResult<Vec<PlaceCandidate>> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait::async_trait]
impl AviationData for Unconfigured {
    async fn airport(&self, _iata: &str) -> ProviderResult<Option<AirportRecord>> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait::async_trait]
impl FlightSchedule for Unconfigured {
    async fn lookup(&self, _query: &ScheduleQuery) -> ProviderResult<Vec<FlightInstance>> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ProviderError::from_status("places", StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, ProviderError::QuotaExceeded { .. }));
        assert!(err.is_fatal());

        let err = ProviderError::from_status("places", StatusCode::PAYMENT_REQUIRED, String::new());
        assert!(matches!(err, ProviderError::QuotaExceeded { .. }));

        let err = ProviderError::from_status("openai", StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, ProviderError::Unauthorized { .. }));
        assert!(err.is_fatal());
        assert!(!err.is_retryable());

        let err = ProviderError::from_status("flights", StatusCode::BAD_GATEWAY, "down".into());
        assert!(matches!(err, ProviderError::Status { status: 502, .. }));
        assert!(!err.is_fatal());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_configured_is_neither_fatal_nor_retryable() {
        let err = ProviderError::NotConfigured("flights");
        assert!(!err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_schedule_query_flight_number() {
        let query = ScheduleQuery {
            carrier_code: "FI".into(),
            number: "614".into(),
            departure_date: None,
            arrival_date: None,
        };
        assert_eq!(query.flight_number(), "FI614");
    }

    #[tokio::test]
    async fn test_unconfigured_providers_report_not_configured() {
        let provider = Unconfigured("places");
        let result = PlaceSearch::search(&provider, "Hotel Borg").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured("places"))));

        let result = AviationData::airport(&provider, "KEF").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured("places"))));
    }
}
