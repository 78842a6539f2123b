use serde_json::json;
use tracing::debug;

use super::context::BatchContext;
use super::draft::{CommonFields, RawActivity, RawDraft, RawFlight, RawHotel, RawRestaurant, RawTransfer};
use super::enricher::{normalize_terminal, FlightEnricher};
use super::resolver::{PlaceQuery, PlaceResolver};
use crate::error::Result;
use crate::item::{
    ActivityData, FlightData, HotelData, ItemDetails, ItemDraft, RestaurantData, TransferData,
};
use crate::localtime::{parse_local_date, parse_optional};
use crate::place::PlaceKind;

const MAX_TITLE_WORDS: usize = 5;
const MIN_MEANINGFUL_WORDS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "in", "on", "at", "to", "for", "with", "from", "by", "or",
    "via", "tour", "tours", "trip", "visit", "excursion", "experience", "including",
];

/// Short display title for an activity: the first five words that are neither
/// stop words nor single characters, or the first five words as written when
/// fewer than three survive the filter.
pub fn synthesize_activity_title(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();

    let meaningful: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() > 1)
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    let chosen = if meaningful.len() < MIN_MEANINGFUL_WORDS {
        &words
    } else {
        &meaningful
    };

    chosen
        .iter()
        .take(MAX_TITLE_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical key for a flight: the number with whitespace removed, uppercased.
pub fn flight_key(raw: &RawFlight) -> Option<String> {
    raw.flight_number
        .as_deref()
        .map(|n| {
            n.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .filter(|n| !n.is_empty())
}

fn apply_common(mut draft: ItemDraft, common: &CommonFields) -> ItemDraft {
    draft.description = common.description.clone();
    draft.confirmation_number = common.confirmation_number.clone();
    draft.client_arranged = common.client_arranged;
    draft
}

/// Transfers resolve nothing at this stage; their places are linked once the
/// whole batch is drafted.
pub fn normalize_transfer(raw: RawTransfer) -> ItemDraft {
    let title = raw
        .common
        .title
        .clone()
        .or_else(|| raw.company_name.clone())
        .or_else(|| raw.contact_name.clone())
        .unwrap_or_else(|| "Transfer Service".to_string());

    let details = ItemDetails::Transfer(TransferData {
        company_name: raw.company_name,
        contact_name: raw.contact_name,
        contact_phone: raw.contact_phone,
        vehicle_type: raw.vehicle_type,
        pickup_location: raw.pickup_location.clone(),
        dropoff_location: raw.dropoff_location.clone(),
        extra: serde_json::Value::Null,
    });

    let mut draft = apply_common(ItemDraft::new(title, details), &raw.common).with_times(
        parse_optional(raw.pickup_time.as_deref()),
        parse_optional(raw.dropoff_time.as_deref()),
    );
    draft.origin_location_detail = raw.pickup_location;
    draft.destination_location_detail = raw.dropoff_location;
    draft
}

/// Maps extracted records onto item drafts, resolving the places they name.
pub struct ItemNormalizer<'a> {
    places: PlaceResolver<'a>,
    flights: FlightEnricher<'a>,
}

impl<'a> ItemNormalizer<'a> {
    pub fn new(places: PlaceResolver<'a>, flights: FlightEnricher<'a>) -> Self {
        Self { places, flights }
    }

    pub async fn normalize(&self, ctx: &mut BatchContext, record: RawDraft) -> Result<ItemDraft> {
        match record {
            RawDraft::Flight(raw) => self.flight(ctx, raw).await,
            RawDraft::Hotel(raw) => self.hotel(ctx, raw).await,
            RawDraft::Transfer(raw) => Ok(normalize_transfer(raw)),
            RawDraft::Restaurant(raw) => self.restaurant(ctx, raw).await,
            RawDraft::Activity(raw) => self.activity(ctx, raw).await,
        }
    }

    pub async fn hotel(&self, ctx: &mut BatchContext, raw: RawHotel) -> Result<ItemDraft> {
        let origin_place_id = match raw.hotel_name.as_deref() {
            Some(name) => {
                let query = PlaceQuery::new(name, PlaceKind::Hotel).with_hints(
                    raw.city.as_deref(),
                    raw.state.as_deref(),
                    raw.country.as_deref(),
                );
                self.places.resolve(ctx, &query).await?
            }
            None => None,
        };

        let title = raw
            .common
            .title
            .clone()
            .unwrap_or_else(|| "Hotel Stay".to_string());

        let extra = match &raw.address {
            Some(address) => json!({ "address": address }),
            None => serde_json::Value::Null,
        };
        let details = ItemDetails::Hotel(HotelData {
            hotel_name: raw.hotel_name,
            room_type: raw.room_type,
            guest_count: raw.guest_count,
            extra,
        });

        let mut draft = apply_common(ItemDraft::new(title, details), &raw.common).with_times(
            parse_optional(raw.check_in_time.as_deref()),
            parse_optional(raw.check_out_time.as_deref()),
        );
        draft.origin_place_id = origin_place_id;
        Ok(draft)
    }

    pub async fn restaurant(
        &self,
        ctx: &mut BatchContext,
        raw: RawRestaurant,
    ) -> Result<ItemDraft> {
        let origin_place_id = match raw.restaurant_name.as_deref() {
            Some(name) => {
                let query = PlaceQuery::new(name, PlaceKind::Restaurant).with_hints(
                    raw.city.as_deref(),
                    raw.state.as_deref(),
                    raw.country.as_deref(),
                );
                self.places.resolve(ctx, &query).await?
            }
            None => None,
        };

        let title = raw
            .common
            .title
            .clone()
            .unwrap_or_else(|| "Restaurant".to_string());

        let details = ItemDetails::Restaurant(RestaurantData {
            restaurant_name: raw.restaurant_name,
            party_size: raw.party_size,
            dietary_notes: raw.dietary_notes.clone(),
            extra: serde_json::Value::Null,
        });

        let mut draft = apply_common(ItemDraft::new(title, details), &raw.common)
            .with_times(parse_optional(raw.reservation_time.as_deref()), None);
        draft.origin_place_id = origin_place_id;
        draft.info = raw.dietary_notes;
        Ok(draft)
    }

    pub async fn activity(&self, ctx: &mut BatchContext, raw: RawActivity) -> Result<ItemDraft> {
        let origin_place_id = match raw.location.as_deref() {
            Some(location) => {
                let query = PlaceQuery::new(location, PlaceKind::Attraction).with_hints(
                    raw.city.as_deref(),
                    raw.state.as_deref(),
                    raw.country.as_deref(),
                );
                self.places.resolve(ctx, &query).await?
            }
            None => None,
        };

        let title = raw
            .common
            .title
            .clone()
            .or_else(|| raw.activity_name.as_deref().map(synthesize_activity_title))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Activity".to_string());

        let details = ItemDetails::Activity(ActivityData {
            activity_name: raw.activity_name,
            operator: raw.operator,
            location: raw.location,
            extra: serde_json::Value::Null,
        });

        let mut draft = apply_common(ItemDraft::new(title, details), &raw.common).with_times(
            parse_optional(raw.start_time.as_deref()),
            parse_optional(raw.end_time.as_deref()),
        );
        draft.origin_place_id = origin_place_id;
        Ok(draft)
    }

    /// Builds a flight draft, preferring schedule data over extracted fields.
    ///
    /// Flight titles always carry the canonical flight number so later runs
    /// can recognise the flight.
    pub async fn flight(&self, ctx: &mut BatchContext, raw: RawFlight) -> Result<ItemDraft> {
        let key = flight_key(&raw);

        let enriched = match &key {
            Some(number) => {
                self.flights
                    .enrich(
                        ctx,
                        number,
                        raw.departure_time.as_deref().and_then(parse_local_date),
                        raw.arrival_time.as_deref().and_then(parse_local_date),
                    )
                    .await?
            }
            None => None,
        };

        let title = match (&key, &raw.airline) {
            (Some(number), Some(airline)) => format!("{airline} {number}"),
            (Some(number), None) => format!("Flight {number}"),
            (None, _) => raw.common.title.clone().unwrap_or_else(|| "Flight".to_string()),
        };

        let extracted_start = parse_optional(raw.departure_time.as_deref());
        let extracted_end = parse_optional(raw.arrival_time.as_deref());
        let extracted_origin = raw.departure_airport.clone();
        let extracted_destination = raw.arrival_airport.clone();
        let extracted_dep_terminal = raw.departure_terminal.as_deref().and_then(normalize_terminal);
        let extracted_arr_terminal = raw.arrival_terminal.as_deref().and_then(normalize_terminal);

        let mut data = FlightData {
            flight_number: key.clone().unwrap_or_default(),
            airline: raw.airline.clone(),
            seat: raw.seat.clone(),
            cabin_class: raw.cabin_class.clone(),
            ..Default::default()
        };

        let draft = match enriched {
            Some(e) => {
                debug!(flight_number = %data.flight_number, "flight enriched from schedule");
                data.carrier_code = e.carrier_code;
                data.origin_code = e.origin_code.or(extracted_origin);
                data.destination_code = e.destination_code.or(extracted_destination);
                data.enriched = true;

                let mut draft = ItemDraft::new(title, ItemDetails::Flight(data))
                    .with_times(e.departure_time.or(extracted_start), e.arrival_time.or(extracted_end));
                draft.origin_place_id = e.origin_place_id;
                draft.destination_place_id = e.destination_place_id;
                draft.origin_location_detail = e.departure_terminal.or(extracted_dep_terminal);
                draft.destination_location_detail = e.arrival_terminal.or(extracted_arr_terminal);
                draft
            }
            None => {
                let airports = self.flights.airports();
                let origin_place_id = match &extracted_origin {
                    Some(code) => airports.resolve(ctx, code).await?,
                    None => None,
                };
                let destination_place_id = match &extracted_destination {
                    Some(code) => airports.resolve(ctx, code).await?,
                    None => None,
                };
                data.origin_code = extracted_origin.map(|c| c.trim().to_ascii_uppercase());
                data.destination_code = extracted_destination.map(|c| c.trim().to_ascii_uppercase());

                let mut draft = ItemDraft::new(title, ItemDetails::Flight(data))
                    .with_times(extracted_start, extracted_end);
                draft.origin_place_id = origin_place_id;
                draft.destination_place_id = destination_place_id;
                draft.origin_location_detail = extracted_dep_terminal;
                draft.destination_location_detail = extracted_arr_terminal;
                draft
            }
        };

        Ok(apply_common(draft, &raw.common))
    }
}
