use std::collections::HashMap;

use uuid::Uuid;

use crate::item::{ItemDetails, ItemDraft};
use crate::place::{Place, PlaceKind};

/// State for one document run.
///
/// Holds the places resolved so far, keyed by the name they were looked up
/// under, and the drafts produced so far. Dropped when the document is done.
#[derive(Debug)]
pub struct BatchContext {
    trip_id: Uuid,
    lookups: HashMap<(String, PlaceKind), Uuid>,
    places: HashMap<Uuid, Place>,
    created: Vec<Uuid>,
    drafts: Vec<ItemDraft>,
}

fn lookup_key(name: &str, kind: PlaceKind) -> (String, PlaceKind) {
    (name.trim().to_lowercase(), kind)
}

impl BatchContext {
    pub fn new(trip_id: Uuid) -> Self {
        Self {
            trip_id,
            lookups: HashMap::new(),
            places: HashMap::new(),
            created: Vec::new(),
            drafts: Vec::new(),
        }
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    /// Place id previously resolved for this name and kind in this run.
    pub fn cached(&self, name: &str, kind: PlaceKind) -> Option<Uuid> {
        self.lookups.get(&lookup_key(name, kind)).copied()
    }

    /// Records the place a lookup resolved to. `created` marks places this run
    /// persisted rather than found.
    pub fn remember(&mut self, name: &str, kind: PlaceKind, place: Place, created: bool) {
        self.lookups.insert(lookup_key(name, kind), place.id);
        if created {
            self.created.push(place.id);
        }
        self.places.insert(place.id, place);
    }

    pub fn place(&self, id: Uuid) -> Option<&Place> {
        self.places.get(&id)
    }

    pub fn place_name(&self, id: Option<Uuid>) -> Option<&str> {
        id.and_then(|id| self.place(id)).map(|p| p.name.as_str())
    }

    pub fn created_places(&self) -> impl Iterator<Item = &Place> {
        self.created.iter().filter_map(|id| self.places.get(id))
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn push_draft(&mut self, draft: ItemDraft) {
        self.drafts.push(draft);
    }

    pub fn drafts(&self) -> &[ItemDraft] {
        &self.drafts
    }

    pub fn drafts_mut(&mut self) -> &mut [ItemDraft] {
        &mut self.drafts
    }

    pub fn into_drafts(self) -> Vec<ItemDraft> {
        self.drafts
    }

    /// Whether a flight draft with this number was already produced in this run.
    pub fn has_flight(&self, flight_number: &str) -> bool {
        self.drafts.iter().any(|d| match &d.details {
            ItemDetails::Flight(data) => data.flight_number == flight_number,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FlightData;

    #[test]
    fn test_lookup_cache_is_case_insensitive() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        let place = Place::bare("The Ritz-Carlton".into(), PlaceKind::Hotel);
        let id = place.id;

        ctx.remember("Ritz Carlton", PlaceKind::Hotel, place, true);

        assert_eq!(ctx.cached("ritz carlton ", PlaceKind::Hotel), Some(id));
        assert_eq!(ctx.cached("Ritz Carlton", PlaceKind::Restaurant), None);
        assert_eq!(ctx.place_name(Some(id)), Some("The Ritz-Carlton"));
        assert_eq!(ctx.created_count(), 1);
    }

    #[test]
    fn test_found_places_not_counted_as_created() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        ctx.remember(
            "KEF",
            PlaceKind::Airport,
            Place::bare("Keflavik".into(), PlaceKind::Airport),
            false,
        );

        assert_eq!(ctx.created_count(), 0);
        assert_eq!(ctx.created_places().count(), 0);
        assert!(ctx.cached("kef", PlaceKind::Airport).is_some());
    }

    #[test]
    fn test_has_flight() {
        let mut ctx = BatchContext::new(Uuid::now_v7());
        ctx.push_draft(ItemDraft::new(
            "FI614".into(),
            ItemDetails::Flight(FlightData {
                flight_number: "FI614".into(),
                ..Default::default()
            }),
        ));

        assert!(ctx.has_flight("FI614"));
        assert!(!ctx.has_flight("FI615"));
    }
}
