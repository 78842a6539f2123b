use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::context::BatchContext;
use super::draft::RawDraft;
use super::enricher::FlightEnricher;
use super::extractor::{parse_extraction_output, placeholder_draft, ExtractionRequest, Extractor};
use super::linker::link_transfers;
use super::normalizer::{flight_key, ItemNormalizer};
use super::resolver::{AirportResolver, PlaceResolver};
use crate::config::RetryConfig;
use crate::item::{Item, ItemDetails, ItemType};
use crate::providers::{
    AviationData, FlightSchedule, KnowledgeIndex, PlaceSearch, ProviderError, Unconfigured,
};
use crate::storage::Storage;
use crate::trip::{Document, DocumentStatus, Trip};

#[derive(Debug, Error)]
pub enum IngestError {
    /// Quota or credential failure; the remaining documents were not attempted.
    #[error("Batch aborted: {0}")]
    Fatal(#[source] ProviderError),
    #[error("Provider error: {0}")]
    Provider(#[source] ProviderError),
    #[error("Storage error: {0}")]
    Storage(#[from] crate::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for IngestError {
    fn from(e: ProviderError) -> Self {
        if e.is_fatal() {
            Self::Fatal(e)
        } else {
            Self::Provider(e)
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub items_created: usize,
    pub places_created: usize,
    /// Flights already on the trip, or repeated within the same extraction.
    pub flights_skipped: usize,
    /// Extracted records dropped for an unknown type or unreadable shape.
    pub records_skipped: usize,
    /// The extraction output was unreadable and a placeholder item was stored.
    pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub document_id: Uuid,
    pub file_name: String,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub trip_id: Uuid,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn new(trip_id: Uuid) -> Self {
        Self {
            trip_id,
            outcomes: Vec::new(),
        }
    }

    fn add_success(&mut self, document: &Document, stats: DocumentStats) {
        self.outcomes.push(DocumentOutcome {
            document_id: document.id,
            file_name: document.file_name.clone(),
            status: DocumentStatus::Processed,
            error: None,
            stats,
        });
    }

    fn add_failure(&mut self, document: &Document, message: String) {
        self.outcomes.push(DocumentOutcome {
            document_id: document.id,
            file_name: document.file_name.clone(),
            status: DocumentStatus::Failed,
            error: Some(message),
            stats: DocumentStats::default(),
        });
    }

    pub fn processed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DocumentStatus::Processed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DocumentStatus::Failed)
            .count()
    }

    pub fn items_created(&self) -> usize {
        self.outcomes.iter().map(|o| o.stats.items_created).sum()
    }

    pub fn places_created(&self) -> usize {
        self.outcomes.iter().map(|o| o.stats.places_created).sum()
    }

    pub fn flights_skipped(&self) -> usize {
        self.outcomes.iter().map(|o| o.stats.flights_skipped).sum()
    }
}

/// Drives a trip's eligible documents through extraction, normalization,
/// linking and persistence, one document at a time.
pub struct BatchOrchestrator<'a> {
    storage: &'a Storage,
    extractor: Box<dyn Extractor>,
    index: Box<dyn KnowledgeIndex>,
    places: Box<dyn PlaceSearch>,
    aviation: Box<dyn AviationData>,
    schedule: Box<dyn FlightSchedule>,
    retry: RetryConfig,
}

impl<'a> BatchOrchestrator<'a> {
    /// Lookup providers start unconfigured; resolution then degrades to bare
    /// places and unenriched flights.
    pub fn new(
        storage: &'a Storage,
        extractor: Box<dyn Extractor>,
        index: Box<dyn KnowledgeIndex>,
    ) -> Self {
        Self {
            storage,
            extractor,
            index,
            places: Box::new(Unconfigured("places")),
            aviation: Box::new(Unconfigured("aviation")),
            schedule: Box::new(Unconfigured("flight_schedule")),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_place_search(mut self, places: Box<dyn PlaceSearch>) -> Self {
        self.places = places;
        self
    }

    pub fn with_aviation(mut self, aviation: Box<dyn AviationData>) -> Self {
        self.aviation = aviation;
        self
    }

    pub fn with_flight_schedule(mut self, schedule: Box<dyn FlightSchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Processes every `uploaded` or `failed` document of the trip.
    ///
    /// Per-document failures are recorded on the document and reported. A
    /// quota or credential failure from extraction or the knowledge index marks
    /// the current document failed and returns [`IngestError::Fatal`] without
    /// touching the rest; lookup providers only ever degrade resolution.
    pub async fn process_trip(&self, trip_id: Uuid) -> IngestResult<BatchReport> {
        let mut trip = self.storage.get_trip(trip_id).await?;
        let documents = self.storage.list_eligible_documents(trip_id).await?;
        let mut report = BatchReport::new(trip_id);

        info!(trip_id = %trip_id, documents = documents.len(), "starting batch");

        for document in &documents {
            match self.process_document(&mut trip, document).await {
                Ok(stats) => {
                    info!(
                        document_id = %document.id,
                        items = stats.items_created,
                        flights_skipped = stats.flights_skipped,
                        "document processed"
                    );
                    report.add_success(document, stats);
                }
                Err(IngestError::Fatal(e)) => {
                    warn!(document_id = %document.id, error = %e, "aborting batch");
                    self.storage
                        .record_document_error(document.id, &e.to_string())
                        .await?;
                    return Err(IngestError::Fatal(e));
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(document_id = %document.id, error = %message, "document failed");
                    self.storage
                        .record_document_error(document.id, &message)
                        .await?;
                    report.add_failure(document, message);
                }
            }
        }

        info!(
            trip_id = %trip_id,
            processed = report.processed_count(),
            failed = report.failed_count(),
            items = report.items_created(),
            "batch finished"
        );

        Ok(report)
    }

    async fn ensure_index(&self, trip: &mut Trip) -> IngestResult<String> {
        if let Some(id) = &trip.knowledge_index_id {
            return Ok(id.clone());
        }

        let id = self.index.create_index(&trip.name).await?;
        self.storage.set_trip_index(trip.id, &id).await?;
        info!(trip_id = %trip.id, index_id = %id, "created knowledge index");
        trip.knowledge_index_id = Some(id.clone());
        Ok(id)
    }

    async fn register(&self, index_id: &str, document: &Document, bytes: &[u8]) -> IngestResult<()> {
        let existing = self.index.list_file_names(index_id).await?;
        if existing.iter().any(|name| name == &document.file_name) {
            return Ok(());
        }

        self.index
            .upload_file(index_id, &document.file_name, bytes.to_vec())
            .await?;
        info!(document_id = %document.id, "registered document in knowledge index");
        Ok(())
    }

    /// Whether a flight with this key already exists on the trip.
    async fn flight_persisted(&self, trip_id: Uuid, key: &str) -> IngestResult<bool> {
        let items = self
            .storage
            .find_items_by_title(trip_id, ItemType::Flight, key)
            .await?;

        Ok(items.iter().any(|item| match &item.details {
            ItemDetails::Flight(data) => data.flight_number == key,
            _ => false,
        }))
    }

    async fn process_document(
        &self,
        trip: &mut Trip,
        document: &Document,
    ) -> IngestResult<DocumentStats> {
        self.storage
            .set_document_status(document.id, DocumentStatus::Processing)
            .await?;
        info!(document_id = %document.id, file = %document.file_name, "processing document");

        let index_id = self.ensure_index(trip).await?;
        let bytes = tokio::fs::read(&document.file_path).await?;
        self.register(&index_id, document, &bytes).await?;

        let request = ExtractionRequest {
            index_id: &index_id,
            file_name: &document.file_name,
            bytes: &bytes,
        };
        let raw = self.extractor.extract(&request).await?;

        let parsed = parse_extraction_output(&raw);
        let mut stats = DocumentStats {
            records_skipped: parsed.skipped,
            ..Default::default()
        };
        let mut ctx = BatchContext::new(trip.id);

        if let Some(reason) = &parsed.failure {
            warn!(document_id = %document.id, reason = %reason, "storing placeholder item");
            ctx.push_draft(placeholder_draft(&document.file_name, reason));
            stats.needs_review = true;
        }

        let normalizer = ItemNormalizer::new(
            PlaceResolver::new(self.storage, self.places.as_ref()),
            FlightEnricher::new(
                self.schedule.as_ref(),
                AirportResolver::new(self.storage, self.aviation.as_ref()),
                self.retry,
            ),
        );

        // Transfers last so every flight and hotel is drafted before linking.
        let (transfers, others): (Vec<RawDraft>, Vec<RawDraft>) = parsed
            .records
            .into_iter()
            .partition(|r| r.item_type() == ItemType::Transfer);

        for record in others.into_iter().chain(transfers) {
            if let RawDraft::Flight(flight) = &record {
                if let Some(key) = flight_key(flight) {
                    if ctx.has_flight(&key) || self.flight_persisted(trip.id, &key).await? {
                        info!(document_id = %document.id, flight_number = %key, "flight already recorded");
                        stats.flights_skipped += 1;
                        continue;
                    }
                }
            }

            let draft = normalizer.normalize(&mut ctx, record).await?;
            ctx.push_draft(draft);
        }

        link_transfers(&mut ctx);

        stats.places_created = ctx.created_count();
        let trip_id = ctx.trip_id();
        let items: Vec<Item> = ctx
            .into_drafts()
            .into_iter()
            .map(|draft| draft.into_item(trip_id, Some(document.id)))
            .collect();

        self.storage.commit_document(document.id, &items, &raw).await?;
        stats.items_created = items.len();
        Ok(stats)
    }
}
