//! Turns uploaded itinerary documents into trip items.
//!
//! Per document: extraction, per-type normalization with place resolution
//! and flight enrichment, transfer linking, then persistence.

mod context;
mod draft;
mod enricher;
mod extractor;
mod linker;
mod normalizer;
mod pipeline;
mod resolver;

pub use context::BatchContext;
pub use draft::{
    CommonFields, DraftError, RawActivity, RawDraft, RawFlight, RawHotel, RawRestaurant,
    RawTransfer,
};
pub use enricher::{
    lookup_with_retry, normalize_terminal, EnrichedFlight, FlightEnricher, FlightNumber,
    ScheduleLookup,
};
pub use extractor::{
    parse_extraction_output, placeholder_draft, strip_json_fences, ExtractionRequest, Extractor,
    ParsedExtraction,
};
pub use linker::link_transfers;
pub use normalizer::{flight_key, normalize_transfer, synthesize_activity_title, ItemNormalizer};
pub use pipeline::{
    BatchOrchestrator, BatchReport, DocumentOutcome, DocumentStats, IngestError, IngestResult,
};
pub use resolver::{airport_code, AirportResolver, PlaceQuery, PlaceResolver};
