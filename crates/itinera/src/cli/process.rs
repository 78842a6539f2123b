use anyhow::{Context, Result};
use console::style;
use itinera_core::providers::{
    AeroDataBoxSchedule, ApiNinjasAviation, AviationData, FlightSchedule, GooglePlacesSearch,
    OpenAiExtractor, OpenAiKnowledgeIndex, PlaceSearch, Unconfigured,
};
use itinera_core::{
    BatchOrchestrator, BatchReport, DocumentStatus, ItineraConfig, ProviderClient, Storage,
};
use uuid::Uuid;

pub async fn run(storage: &Storage, config: &ItineraConfig, trip_id: Uuid) -> Result<()> {
    config.validate()?;
    let client = ProviderClient::new(config.network.clone())?;
    let api_key = config
        .openai
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;

    let extractor = OpenAiExtractor::new(
        client.clone(),
        api_key.clone(),
        config.openai.base_url.clone(),
        config.openai.model.clone(),
    );
    let index = OpenAiKnowledgeIndex::new(client.clone(), api_key, config.openai.base_url.clone());

    let places: Box<dyn PlaceSearch> = match &config.places.api_key {
        Some(key) => Box::new(GooglePlacesSearch::new(
            client.clone(),
            key.clone(),
            config.places.base_url.clone(),
        )),
        None => Box::new(Unconfigured("places")),
    };
    let aviation: Box<dyn AviationData> = match &config.aviation.api_key {
        Some(key) => Box::new(ApiNinjasAviation::new(
            client.clone(),
            key.clone(),
            config.aviation.base_url.clone(),
        )),
        None => Box::new(Unconfigured("aviation")),
    };
    let schedule: Box<dyn FlightSchedule> = match &config.flights.api_key {
        Some(key) => Box::new(AeroDataBoxSchedule::new(
            client,
            key.clone(),
            config.flights.base_url.clone(),
            config.flights.host.clone(),
        )),
        None => Box::new(Unconfigured("flight_schedule")),
    };

    let report = BatchOrchestrator::new(storage, Box::new(extractor), Box::new(index))
        .with_place_search(places)
        .with_aviation(aviation)
        .with_flight_schedule(schedule)
        .with_retry(config.retry)
        .process_trip(trip_id)
        .await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    if report.outcomes.is_empty() {
        eprintln!("Nothing to process");
        return;
    }

    for outcome in &report.outcomes {
        match outcome.status {
            DocumentStatus::Processed => {
                let review = if outcome.stats.needs_review {
                    format!(" {}", style("needs review").yellow())
                } else {
                    String::new()
                };
                println!(
                    "  {} {} items, {} places, {} flights already recorded{}",
                    style(&outcome.file_name).bold(),
                    outcome.stats.items_created,
                    outcome.stats.places_created,
                    outcome.stats.flights_skipped,
                    review
                );
            }
            _ => println!(
                "  {} {} {}",
                style(&outcome.file_name).bold(),
                style("failed").red(),
                outcome.error.as_deref().unwrap_or("")
            ),
        }
    }

    eprintln!(
        "Processed {} document(s), {} failed, {} item(s) created",
        report.processed_count(),
        report.failed_count(),
        report.items_created()
    );
}
