use tracing::{debug, warn};
use uuid::Uuid;

use super::context::BatchContext;
use crate::error::{Error, Result};
use crate::place::{format_utc_offset, Place, PlaceAddress, PlaceDetails, PlaceKind};
use crate::providers::{AddressComponent, AirportRecord, AviationData, PlaceCandidate, PlaceSearch};
use crate::storage::Storage;

/// A free-text place reference plus optional location hints.
#[derive(Debug, Clone, Copy)]
pub struct PlaceQuery<'a> {
    pub name: &'a str,
    pub kind: PlaceKind,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub country: Option<&'a str>,
}

impl<'a> PlaceQuery<'a> {
    pub fn new(name: &'a str, kind: PlaceKind) -> Self {
        Self {
            name,
            kind,
            city: None,
            state: None,
            country: None,
        }
    }

    #[must_use]
    pub fn with_hints(
        mut self,
        city: Option<&'a str>,
        state: Option<&'a str>,
        country: Option<&'a str>,
    ) -> Self {
        self.city = city;
        self.state = state;
        self.country = country;
        self
    }

    /// The name followed by whichever hints are present, comma separated.
    pub fn search_text(&self) -> String {
        std::iter::once(self.name)
            .chain(self.city)
            .chain(self.state)
            .chain(self.country)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Inserts `place`, or returns the already-stored place when another writer
/// got there first with the same external id.
async fn persist_place(storage: &Storage, place: Place) -> Result<(Place, bool)> {
    match storage.insert_place(&place).await {
        Ok(()) => Ok((place, true)),
        Err(Error::DuplicatePlace(external_id)) => {
            match storage.find_place_by_external_id(&external_id).await? {
                Some(existing) => Ok((existing, false)),
                None => Err(Error::DuplicatePlace(external_id)),
            }
        }
        Err(e) => Err(e),
    }
}

fn component<'c>(candidate: &'c PlaceCandidate, kind: &str) -> Option<&'c AddressComponent> {
    candidate
        .components
        .iter()
        .find(|c| c.types.iter().any(|t| t == kind))
}

fn address_from(candidate: &PlaceCandidate) -> PlaceAddress {
    let long = |kind: &str| component(candidate, kind).map(|c| c.long_text.clone());
    let short = |kind: &str| component(candidate, kind).map(|c| c.short_text.clone());

    let line = match (long("street_number"), long("route")) {
        (Some(number), Some(route)) => Some(format!("{number} {route}")),
        (None, route) => route,
        (number, None) => number,
    };

    PlaceAddress {
        line,
        city: long("locality").or_else(|| long("postal_town")),
        state: short("administrative_area_level_1"),
        country: long("country"),
        postal_code: long("postal_code"),
        formatted: candidate.formatted_address.clone(),
    }
}

fn place_from_candidate(candidate: &PlaceCandidate, kind: PlaceKind) -> Place {
    let details = PlaceDetails {
        address: address_from(candidate),
        latitude: candidate.latitude,
        longitude: candidate.longitude,
        timezone: candidate.utc_offset_minutes.map(format_utc_offset),
    };

    Place::bare(candidate.name.clone(), kind)
        .with_external_id(candidate.external_id.clone())
        .with_details(details)
}

/// Resolves free-text names to places: batch cache, then the store, then the
/// place-search provider, then a bare record.
pub struct PlaceResolver<'a> {
    storage: &'a Storage,
    search: &'a dyn PlaceSearch,
}

impl<'a> PlaceResolver<'a> {
    pub fn new(storage: &'a Storage, search: &'a dyn PlaceSearch) -> Self {
        Self { storage, search }
    }

    /// `Ok(None)` only for a blank name. Provider failures never surface here.
    pub async fn resolve(
        &self,
        ctx: &mut BatchContext,
        query: &PlaceQuery<'_>,
    ) -> Result<Option<Uuid>> {
        let name = query.name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        if let Some(id) = ctx.cached(name, query.kind) {
            debug!(name, kind = %query.kind, "place cache hit");
            return Ok(Some(id));
        }

        if let Some(existing) = self.storage.find_place_by_key(query.kind, name).await? {
            let id = existing.id;
            ctx.remember(name, query.kind, existing, false);
            return Ok(Some(id));
        }

        let candidate = match self.search.search(&query.search_text()).await {
            Ok(candidates) => candidates.into_iter().next(),
            Err(e) => {
                warn!(name, error = %e, "place search failed, storing bare place");
                None
            }
        };

        let (place, created) = match candidate {
            Some(candidate) => {
                if let Some(existing) = self
                    .storage
                    .find_place_by_external_id(&candidate.external_id)
                    .await?
                {
                    (existing, false)
                } else {
                    persist_place(self.storage, place_from_candidate(&candidate, query.kind))
                        .await?
                }
            }
            None => persist_place(self.storage, Place::bare(name.to_string(), query.kind)).await?,
        };

        let id = place.id;
        ctx.remember(name, query.kind, place, created);
        Ok(Some(id))
    }
}

fn place_from_airport(code: &str, record: AirportRecord) -> Place {
    let details = PlaceDetails {
        address: PlaceAddress {
            city: record.city,
            state: record.state,
            country: record.country,
            ..Default::default()
        },
        latitude: record.latitude,
        longitude: record.longitude,
        timezone: record.timezone,
    };

    Place::bare(record.name, PlaceKind::Airport)
        .with_short_code(code)
        .with_details(details)
}

/// Normalizes an IATA airport code; `None` unless it is three letters.
pub fn airport_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())).then_some(code)
}

/// Resolves IATA codes to airport places. Unlike [`PlaceResolver`], a code the
/// aviation provider cannot confirm resolves to nothing.
pub struct AirportResolver<'a> {
    storage: &'a Storage,
    aviation: &'a dyn AviationData,
}

impl<'a> AirportResolver<'a> {
    pub fn new(storage: &'a Storage, aviation: &'a dyn AviationData) -> Self {
        Self { storage, aviation }
    }

    pub async fn resolve(&self, ctx: &mut BatchContext, iata: &str) -> Result<Option<Uuid>> {
        let Some(code) = airport_code(iata) else {
            debug!(iata, "not an airport code");
            return Ok(None);
        };

        if let Some(id) = ctx.cached(&code, PlaceKind::Airport) {
            return Ok(Some(id));
        }

        if let Some(existing) = self.storage.find_place_by_key(PlaceKind::Airport, &code).await? {
            let id = existing.id;
            ctx.remember(&code, PlaceKind::Airport, existing, false);
            return Ok(Some(id));
        }

        let record = match self.aviation.airport(&code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(iata = %code, "airport unknown to aviation provider");
                return Ok(None);
            }
            Err(e) => {
                warn!(iata = %code, error = %e, "airport lookup failed");
                return Ok(None);
            }
        };

        let place = place_from_airport(&code, record);
        self.storage.insert_place(&place).await?;

        let id = place.id;
        ctx.remember(&code, PlaceKind::Airport, place, true);
        Ok(Some(id))
    }
}
