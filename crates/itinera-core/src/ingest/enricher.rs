use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::context::BatchContext;
use super::resolver::AirportResolver;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::localtime::parse_optional;
use crate::providers::{FlightInstance, FlightSchedule, ScheduleQuery};

static FLIGHT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2,3})(\d+)$").expect("valid flight number pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightNumber {
    pub carrier_code: String,
    pub number: String,
}

impl FlightNumber {
    /// Splits `"FI 614"` style input into carrier and numeric suffix.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        let caps = FLIGHT_NUMBER.captures(&compact)?;
        Some(Self {
            carrier_code: caps[1].to_string(),
            number: caps[2].to_string(),
        })
    }
}

impl std::fmt::Display for FlightNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.carrier_code, self.number)
    }
}

/// `"2"` becomes `"T2"`; anything longer passes through.
pub fn normalize_terminal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (None, _) => None,
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(format!("T{c}")),
        _ => Some(trimmed.to_string()),
    }
}

/// Outcome of the bounded schedule lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleLookup {
    Found(FlightInstance),
    Empty,
    Exhausted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedFlight {
    pub carrier_code: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub origin_place_id: Option<Uuid>,
    pub destination_place_id: Option<Uuid>,
    pub departure_terminal: Option<String>,
    pub arrival_terminal: Option<String>,
}

/// Queries the schedule provider, retrying transport and non-2xx failures
/// with a linear delay of `base_delay_ms * attempt`.
pub async fn lookup_with_retry(
    schedule: &dyn FlightSchedule,
    retry: RetryConfig,
    query: &ScheduleQuery,
) -> ScheduleLookup {
    let flight_number = query.flight_number();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match schedule.lookup(query).await {
            Ok(flights) => {
                return match flights.into_iter().next() {
                    Some(flight) => ScheduleLookup::Found(flight),
                    None => ScheduleLookup::Empty,
                };
            }
            Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                let delay = Duration::from_millis(retry.base_delay_ms * u64::from(attempt));
                warn!(
                    flight_number = %flight_number,
                    attempt,
                    error = %e,
                    "schedule lookup failed; retrying after {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(flight_number = %flight_number, attempt, error = %e, "giving up on schedule lookup");
                return ScheduleLookup::Exhausted;
            }
        }
    }
}

pub struct FlightEnricher<'a> {
    schedule: &'a dyn FlightSchedule,
    airports: AirportResolver<'a>,
    retry: RetryConfig,
}

impl<'a> FlightEnricher<'a> {
    pub fn new(
        schedule: &'a dyn FlightSchedule,
        airports: AirportResolver<'a>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            schedule,
            airports,
            retry,
        }
    }

    pub fn airports(&self) -> &AirportResolver<'a> {
        &self.airports
    }

    pub async fn lookup(&self, query: &ScheduleQuery) -> ScheduleLookup {
        lookup_with_retry(self.schedule, self.retry, query).await
    }

    /// Authoritative schedule data for a flight, or `None` when the number is
    /// malformed or the provider has nothing.
    pub async fn enrich(
        &self,
        ctx: &mut BatchContext,
        flight_number: &str,
        departure_date: Option<NaiveDate>,
        arrival_date: Option<NaiveDate>,
    ) -> Result<Option<EnrichedFlight>> {
        let Some(parsed) = FlightNumber::parse(flight_number) else {
            warn!(flight_number, "malformed flight number, skipping enrichment");
            return Ok(None);
        };

        let query = ScheduleQuery {
            carrier_code: parsed.carrier_code.clone(),
            number: parsed.number.clone(),
            departure_date,
            arrival_date,
        };

        let instance = match self.lookup(&query).await {
            ScheduleLookup::Found(instance) => instance,
            ScheduleLookup::Empty => {
                debug!(flight_number = %parsed, "no scheduled instance found");
                return Ok(None);
            }
            ScheduleLookup::Exhausted => return Ok(None),
        };

        let origin_code = instance.departure.airport_iata.clone();
        let destination_code = instance.arrival.airport_iata.clone();

        let origin_place_id = match &origin_code {
            Some(code) => self.airports.resolve(ctx, code).await?,
            None => None,
        };
        let destination_place_id = match &destination_code {
            Some(code) => self.airports.resolve(ctx, code).await?,
            None => None,
        };

        Ok(Some(EnrichedFlight {
            carrier_code: instance.carrier_iata.clone().or(Some(parsed.carrier_code)),
            departure_time: parse_optional(instance.departure.local_time.as_deref()),
            arrival_time: parse_optional(instance.arrival.local_time.as_deref()),
            origin_code,
            destination_code,
            origin_place_id,
            destination_place_id,
            departure_terminal: instance.departure.terminal.as_deref().and_then(normalize_terminal),
            arrival_terminal: instance.arrival.terminal.as_deref().and_then(normalize_terminal),
        }))
    }
}
