//! Assigns places to transfers from the other drafts of the same batch.
//!
//! A transfer's pickup becomes its origin and its dropoff its destination.
//! Text hints are tried first: airport codes and airport names against the
//! batch's flights, then hotel names. When neither hint lands, the nearest
//! flight or hotel within six hours of the transfer decides.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::context::BatchContext;
use crate::item::{ItemDetails, ItemDraft};

const FALLBACK_WINDOW_HOURS: i64 = 6;
const HOTEL_SIMILARITY: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone)]
enum AnchorKind {
    Flight {
        has_carrier: bool,
        origin_code: Option<String>,
        destination_code: Option<String>,
    },
    Hotel {
        names: Vec<String>,
    },
}

/// Snapshot of a flight or hotel draft the linker can match against.
#[derive(Debug, Clone)]
struct Anchor {
    kind: AnchorKind,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    origin_place_id: Option<Uuid>,
    destination_place_id: Option<Uuid>,
    origin_name: Option<String>,
    destination_name: Option<String>,
}

impl Anchor {
    fn from_draft(draft: &ItemDraft, ctx: &BatchContext) -> Option<Self> {
        let kind = match &draft.details {
            ItemDetails::Flight(data) => AnchorKind::Flight {
                has_carrier: data.carrier_code.is_some(),
                origin_code: data.origin_code.clone(),
                destination_code: data.destination_code.clone(),
            },
            ItemDetails::Hotel(data) => AnchorKind::Hotel {
                names: ctx
                    .place_name(draft.origin_place_id)
                    .map(str::to_string)
                    .into_iter()
                    .chain(data.hotel_name.clone())
                    .collect(),
            },
            _ => return None,
        };

        Some(Self {
            kind,
            start: draft.start_time,
            end: draft.end_time,
            origin_place_id: draft.origin_place_id,
            destination_place_id: draft.destination_place_id,
            origin_name: ctx.place_name(draft.origin_place_id).map(str::to_string),
            destination_name: ctx.place_name(draft.destination_place_id).map(str::to_string),
        })
    }

    /// The place a transfer in `direction` would use, and the time that place
    /// is reached or left.
    fn endpoint(&self, direction: Direction) -> (Option<Uuid>, Option<DateTime<Utc>>) {
        match (&self.kind, direction) {
            // Picked up where the flight lands; dropped off where it departs.
            (AnchorKind::Flight { .. }, Direction::Pickup) => {
                (self.destination_place_id, self.end.or(self.start))
            }
            (AnchorKind::Flight { .. }, Direction::Dropoff) => (self.origin_place_id, self.start),
            // Picked up at checkout; dropped off at check-in.
            (AnchorKind::Hotel { .. }, Direction::Pickup) => (self.origin_place_id, self.end),
            (AnchorKind::Hotel { .. }, Direction::Dropoff) => (self.origin_place_id, self.start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    place_id: Uuid,
    /// The anchor's time is later than the transfer's.
    after_transfer: bool,
    delta: Option<Duration>,
}

impl Candidate {
    fn new(
        place_id: Uuid,
        anchor_time: Option<DateTime<Utc>>,
        transfer_time: Option<DateTime<Utc>>,
    ) -> Self {
        let (after_transfer, delta) = match (anchor_time, transfer_time) {
            (Some(anchor), Some(transfer)) => (anchor > transfer, Some((anchor - transfer).abs())),
            _ => (false, None),
        };
        Self {
            place_id,
            after_transfer,
            delta,
        }
    }
}

/// Anchors after the transfer first, then the smallest time difference;
/// candidates without a time sort last.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.after_transfer
        .cmp(&a.after_transfer)
        .then_with(|| match (a.delta, b.delta) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

fn best(mut candidates: Vec<Candidate>) -> Option<Uuid> {
    candidates.sort_by(compare_candidates);
    candidates.first().map(|c| c.place_id)
}

fn is_bare_code(hint: &str) -> bool {
    hint.len() == 3 && hint.bytes().all(|b| b.is_ascii_uppercase())
}

fn mentions_airport(hint_lower: &str) -> bool {
    hint_lower.contains("airport") || hint_lower.contains("international")
}

fn loosely_matches(hint_lower: &str, name: &str) -> bool {
    let name = name.to_lowercase();
    !name.is_empty() && (hint_lower.contains(&name) || name.contains(hint_lower))
}

fn flight_matches(anchor: &Anchor, direction: Direction, hint: &str) -> bool {
    let AnchorKind::Flight {
        has_carrier,
        origin_code,
        destination_code,
    } = &anchor.kind
    else {
        return false;
    };

    let (code, name) = match direction {
        Direction::Pickup => (destination_code, &anchor.destination_name),
        Direction::Dropoff => (origin_code, &anchor.origin_name),
    };

    if is_bare_code(hint) {
        return *has_carrier && code.as_deref() == Some(hint);
    }

    let hint_lower = hint.to_lowercase();
    if !mentions_airport(&hint_lower) {
        return false;
    }

    let code_mentioned = code
        .as_deref()
        .is_some_and(|c| hint.split(|ch: char| !ch.is_alphanumeric()).any(|w| w == c));
    code_mentioned || name.as_deref().is_some_and(|n| loosely_matches(&hint_lower, n))
}

fn hotel_matches(anchor: &Anchor, hint: &str) -> bool {
    let AnchorKind::Hotel { names } = &anchor.kind else {
        return false;
    };

    let hint_lower = hint.trim().to_lowercase();
    if hint_lower == "hotel" {
        return true;
    }

    names.iter().any(|name| {
        loosely_matches(&hint_lower, name)
            || strsim::normalized_levenshtein(&hint_lower, &name.to_lowercase()) >= HOTEL_SIMILARITY
    })
}

fn resolve_hint(
    anchors: &[Anchor],
    direction: Direction,
    hint: &str,
    transfer_time: Option<DateTime<Utc>>,
) -> Option<Uuid> {
    let hint = hint.trim();
    if hint.is_empty() {
        return None;
    }

    let candidates_for = |matches: &dyn Fn(&Anchor) -> bool| -> Vec<Candidate> {
        anchors
            .iter()
            .filter(|a| matches(a))
            .filter_map(|a| {
                let (place_id, time) = a.endpoint(direction);
                place_id.map(|id| Candidate::new(id, time, transfer_time))
            })
            .collect()
    };

    best(candidates_for(&|a| flight_matches(a, direction, hint)))
        .or_else(|| best(candidates_for(&|a| hotel_matches(a, hint))))
}

/// Nearest anchor within the window on the correct side of `time`: reached at
/// or before it for a pickup, starting at or after it for a dropoff.
fn temporal_fallback(anchors: &[Anchor], direction: Direction, time: DateTime<Utc>) -> Option<Uuid> {
    let window = Duration::hours(FALLBACK_WINDOW_HOURS);

    let mut candidates: Vec<Candidate> = anchors
        .iter()
        .filter_map(|a| {
            let (place_id, anchor_time) = match direction {
                Direction::Pickup => a.endpoint(Direction::Pickup),
                // Earliest item starting after the transfer: flights depart from
                // their origin, hotels start at check-in.
                Direction::Dropoff => (a.origin_place_id, a.start),
            };
            let (place_id, anchor_time) = (place_id?, anchor_time?);

            let in_window = match direction {
                Direction::Pickup => anchor_time <= time && time - anchor_time <= window,
                Direction::Dropoff => anchor_time >= time && anchor_time - time <= window,
            };
            in_window.then(|| Candidate::new(place_id, Some(anchor_time), Some(time)))
        })
        .collect();

    candidates.sort_by(|a, b| a.delta.cmp(&b.delta));
    candidates.first().map(|c| c.place_id)
}

fn link_one(anchors: &[Anchor], draft: &mut ItemDraft) {
    let ItemDetails::Transfer(data) = &draft.details else {
        return;
    };
    let pickup_hint = data.pickup_location.clone();
    let dropoff_hint = data.dropoff_location.clone();

    let pickup_time = draft.start_time;
    let dropoff_time = draft.end_time.or(draft.start_time);

    let mut origin = pickup_hint
        .as_deref()
        .and_then(|h| resolve_hint(anchors, Direction::Pickup, h, pickup_time));
    let mut destination = dropoff_hint
        .as_deref()
        .and_then(|h| resolve_hint(anchors, Direction::Dropoff, h, dropoff_time));

    if origin.is_none() && destination.is_none() {
        if let Some(start) = draft.start_time {
            origin = temporal_fallback(anchors, Direction::Pickup, start);
            destination = temporal_fallback(anchors, Direction::Dropoff, start);
        }
    }

    debug!(
        title = %draft.title,
        origin = ?origin,
        destination = ?destination,
        "linked transfer"
    );

    if draft.origin_place_id.is_none() {
        draft.origin_place_id = origin;
    }
    if draft.destination_place_id.is_none() {
        draft.destination_place_id = destination;
    }
}

/// Fills in transfer origins and destinations from the batch's flights and hotels.
/// Transfers that match nothing keep their places unset.
pub fn link_transfers(ctx: &mut BatchContext) {
    let snapshot: &BatchContext = ctx;
    let anchors: Vec<Anchor> = snapshot
        .drafts()
        .iter()
        .filter_map(|d| Anchor::from_draft(d, snapshot))
        .collect();

    for draft in ctx.drafts_mut() {
        link_one(&anchors, draft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FlightData, HotelData, TransferData};
    use crate::localtime::parse_local_time;
    use crate::place::{Place, PlaceKind};

    fn at(raw: &str) -> Option<DateTime<Utc>> {
        parse_local_time(raw)
    }

    fn airport(ctx: &mut BatchContext, code: &str, name: &str) -> Uuid {
        let place = Place::bare(name.into(), PlaceKind::Airport).with_short_code(code);
        let id = place.id;
        ctx.remember(code, PlaceKind::Airport, place, true);
        id
    }

    fn hotel_place(ctx: &mut BatchContext, name: &str) -> Uuid {
        let place = Place::bare(name.into(), PlaceKind::Hotel);
        let id = place.id;
        ctx.remember(name, PlaceKind::Hotel, place, true);
        id
    }

    fn flight(
        number: &str,
        origin: (&str, Uuid),
        destination: (&str, Uuid),
        depart: &str,
        arrive: &str,
    ) -> ItemDraft {
        let mut draft = ItemDraft::new(
            format!("Flight {number}"),
            ItemDetails::Flight(FlightData {
                flight_number: number.into(),
                carrier_code: Some(number[..2].into()),
                origin_code: Some(origin.0.into()),
                destination_code: Some(destination.0.into()),
                enriched: true,
                ..Default::default()
            }),
        )
        .with_times(at(depart), at(arrive));
        draft.origin_place_id = Some(origin.1);
        draft.destination_place_id = Some(destination.1);
        draft
    }

    fn hotel(place_id: Uuid, name: &str, check_in: &str, check_out: &str) -> ItemDraft {
        let mut draft = ItemDraft::new(
            "Hotel Stay".into(),
            ItemDetails::Hotel(HotelData {
                hotel_name: Some(name.into()),
                ..Default::default()
            }),
        )
        .with_times(at(check_in), at(check_out));
        draft.origin_place_id = Some(place_id);
        draft
    }

    fn transfer(pickup: Option<&str>, dropoff: Option<&str>, start: &str) -> ItemDraft {
        ItemDraft::new(
            "Transfer Service".into(),
            ItemDetails::Transfer(TransferData {
                pickup_location: pickup.map(String::from),
                dropoff_location: dropoff.map(String::from),
                ..Default::default()
            }),
        )
        .with_times(at(start), None)
    }

    fn last_transfer(ctx: &BatchContext) -> &ItemDraft {
        ctx.drafts()
            .iter()
            .rev()
            .find(|d| matches!(d.details, ItemDetails::Transfer(_)))
            .unwrap()
    }

    #[test]
    fn test_pickup_code_matches_flight_destination() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");

        ctx.push_draft(flight("FI614", ("KEF", kef), ("JFK", jfk), "2024-06-01T11:00", "2024-06-01T14:00"));
        ctx.push_draft(transfer(Some("JFK"), None, "2024-06-01T14:45"));

        link_transfers(&mut ctx);

        assert_eq!(last_transfer(&ctx).origin_place_id, Some(jfk));
        assert!(last_transfer(&ctx).destination_place_id.is_none());
    }

    #[test]
    fn test_bare_code_needs_enriched_flight() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");

        let mut unenriched = flight("FI614", ("KEF", kef), ("JFK", jfk), "2024-06-01T11:00", "2024-06-01T14:00");
        if let ItemDetails::Flight(data) = &mut unenriched.details {
            data.carrier_code = None;
        }
        ctx.push_draft(unenriched);
        ctx.push_draft(transfer(Some("JFK"), None, "2024-06-02T20:00"));

        link_transfers(&mut ctx);

        assert!(last_transfer(&ctx).origin_place_id.is_none());
    }

    #[test]
    fn test_dropoff_airport_name_matches_flight_origin() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");

        ctx.push_draft(flight("FI615", ("KEF", kef), ("JFK", jfk), "2024-06-05T17:00", "2024-06-05T18:30"));
        ctx.push_draft(transfer(None, Some("Keflavik International Airport"), "2024-06-05T13:30"));

        link_transfers(&mut ctx);

        assert_eq!(last_transfer(&ctx).destination_place_id, Some(kef));
    }

    #[test]
    fn test_flights_after_transfer_preferred() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");
        let bos = airport(&mut ctx, "BOS", "Logan International Airport");

        // Departs KEF an hour before the transfer.
        ctx.push_draft(flight("FI630", ("KEF", kef), ("BOS", bos), "2024-06-05T12:00", "2024-06-05T13:30"));
        // Departs KEF four hours after it.
        ctx.push_draft(flight("FI615", ("KEF", kef), ("JFK", jfk), "2024-06-05T17:00", "2024-06-05T18:30"));
        ctx.push_draft(transfer(None, Some("KEF"), "2024-06-05T13:00"));

        let anchors: Vec<Anchor> = ctx
            .drafts()
            .iter()
            .filter_map(|d| Anchor::from_draft(d, &ctx))
            .collect();
        let mut candidates: Vec<Candidate> = anchors
            .iter()
            .filter(|a| flight_matches(a, Direction::Dropoff, "KEF"))
            .filter_map(|a| {
                let (id, time) = a.endpoint(Direction::Dropoff);
                id.map(|id| Candidate::new(id, time, at("2024-06-05T13:00")))
            })
            .collect();

        assert_eq!(candidates.len(), 2);
        candidates.sort_by(compare_candidates);
        assert!(candidates[0].after_transfer);
        assert_eq!(candidates[0].delta, Some(Duration::hours(4)));
    }

    #[test]
    fn test_candidate_ordering() {
        let id = Uuid::now_v7();
        let near_before = Candidate {
            place_id: id,
            after_transfer: false,
            delta: Some(Duration::minutes(10)),
        };
        let far_after = Candidate {
            place_id: id,
            after_transfer: true,
            delta: Some(Duration::hours(5)),
        };
        let near_after = Candidate {
            place_id: id,
            after_transfer: true,
            delta: Some(Duration::hours(1)),
        };
        let untimed = Candidate {
            place_id: id,
            after_transfer: false,
            delta: None,
        };

        let mut all = vec![untimed, near_before, far_after, near_after];
        all.sort_by(compare_candidates);
        assert_eq!(all, vec![near_after, far_after, near_before, untimed]);
    }

    #[test]
    fn test_hotel_name_hint() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let ritz = hotel_place(&mut ctx, "The Ritz-Carlton New York");

        ctx.push_draft(hotel(ritz, "Ritz Carlton", "2024-06-01T15:00", "2024-06-04T11:00"));
        ctx.push_draft(transfer(None, Some("Ritz-Carlton Hotel"), "2024-06-01T14:00"));
        ctx.push_draft(transfer(Some("hotel"), None, "2024-06-04T11:30"));

        link_transfers(&mut ctx);

        let transfers: Vec<&ItemDraft> = ctx
            .drafts()
            .iter()
            .filter(|d| matches!(d.details, ItemDetails::Transfer(_)))
            .collect();
        // No name match for the arrival, so check-in an hour later decides.
        assert_eq!(transfers[0].destination_place_id, Some(ritz));
        assert_eq!(transfers[1].origin_place_id, Some(ritz));
    }

    #[test]
    fn test_hotel_name_inside_hint_links_outside_window() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let ritz = hotel_place(&mut ctx, "The Ritz-Carlton New York");

        ctx.push_draft(hotel(ritz, "Ritz Carlton", "2024-06-01T15:00", "2024-06-04T11:00"));
        // A day away from both check-in and check-out.
        ctx.push_draft(transfer(None, Some("Ritz Carlton lobby"), "2024-06-02T20:00"));
        ctx.push_draft(transfer(Some("Ritz Carlton lobby"), None, "2024-06-03T09:00"));
        ctx.push_draft(transfer(None, Some("Hilton lobby"), "2024-06-02T20:00"));

        link_transfers(&mut ctx);

        let transfers: Vec<&ItemDraft> = ctx
            .drafts()
            .iter()
            .filter(|d| matches!(d.details, ItemDetails::Transfer(_)))
            .collect();
        assert_eq!(transfers[0].destination_place_id, Some(ritz));
        assert_eq!(transfers[0].origin_place_id, None);
        assert_eq!(transfers[1].origin_place_id, Some(ritz));
        assert_eq!(transfers[1].destination_place_id, None);
        assert_eq!(transfers[2].destination_place_id, None);
    }

    #[test]
    fn test_hotel_similarity() {
        let anchor = Anchor {
            kind: AnchorKind::Hotel {
                names: vec!["Ritz Carlton".into()],
            },
            start: None,
            end: None,
            origin_place_id: Some(Uuid::now_v7()),
            destination_place_id: None,
            origin_name: None,
            destination_name: None,
        };
        assert!(hotel_matches(&anchor, "Ritz-Carlton"));
        assert!(hotel_matches(&anchor, "the ritz carlton downtown"));
        assert!(!hotel_matches(&anchor, "Hilton"));
    }

    #[test]
    fn test_temporal_fallback_uses_hotel_checkout() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let borg = hotel_place(&mut ctx, "Hotel Borg");

        ctx.push_draft(hotel(borg, "Hotel Borg", "2024-06-01T15:00", "2024-06-04T15:30"));
        ctx.push_draft(transfer(None, None, "2024-06-04T16:00"));

        link_transfers(&mut ctx);

        assert_eq!(last_transfer(&ctx).origin_place_id, Some(borg));
    }

    #[test]
    fn test_temporal_fallback_dropoff_at_next_departure() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let borg = hotel_place(&mut ctx, "Hotel Borg");
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");

        ctx.push_draft(hotel(borg, "Hotel Borg", "2024-06-01T15:00", "2024-06-04T12:00"));
        ctx.push_draft(flight("FI615", ("KEF", kef), ("JFK", jfk), "2024-06-04T17:00", "2024-06-04T18:30"));
        ctx.push_draft(transfer(Some("lobby"), None, "2024-06-04T13:00"));

        link_transfers(&mut ctx);

        let linked = last_transfer(&ctx);
        assert_eq!(linked.origin_place_id, Some(borg));
        assert_eq!(linked.destination_place_id, Some(kef));
    }

    #[test]
    fn test_nothing_within_window_keeps_places_unset() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let borg = hotel_place(&mut ctx, "Hotel Borg");
        let kef = airport(&mut ctx, "KEF", "Keflavik International Airport");
        let jfk = airport(&mut ctx, "JFK", "John F Kennedy International Airport");

        ctx.push_draft(hotel(borg, "Hotel Borg", "2024-06-01T15:00", "2024-06-04T08:00"));
        ctx.push_draft(flight("FI615", ("KEF", kef), ("JFK", jfk), "2024-06-04T22:30", "2024-06-05T00:30"));
        ctx.push_draft(transfer(None, None, "2024-06-04T15:00"));

        link_transfers(&mut ctx);

        let linked = last_transfer(&ctx);
        assert!(linked.origin_place_id.is_none());
        assert!(linked.destination_place_id.is_none());
    }

    #[test]
    fn test_untimed_transfer_without_hints_untouched() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let borg = hotel_place(&mut ctx, "Hotel Borg");
        ctx.push_draft(hotel(borg, "Hotel Borg", "2024-06-01T15:00", "2024-06-04T08:00"));
        ctx.push_draft(ItemDraft::new(
            "Transfer Service".into(),
            ItemDetails::Transfer(TransferData::default()),
        ));

        link_transfers(&mut ctx);

        assert!(last_transfer(&ctx).origin_place_id.is_none());
    }
}
