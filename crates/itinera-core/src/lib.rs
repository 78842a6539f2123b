pub mod config;
pub mod error;
pub mod ingest;
pub mod item;
pub mod localtime;
pub mod network;
pub mod place;
pub mod providers;
pub mod storage;
pub mod trip;

pub use config::{
    AviationConfig, ConfigError, FlightScheduleConfig, ItineraConfig, OpenAiConfig, PlacesConfig,
    RetryConfig,
};
pub use error::{Error, Result};
pub use ingest::{BatchOrchestrator, BatchReport, DocumentOutcome, IngestError, IngestResult};
pub use item::{
    ActivityData, FlightData, HotelData, Item, ItemDetails, ItemDraft, ItemType, RestaurantData,
    TransferData,
};
pub use network::{NetworkConfig, ProviderClient};
pub use place::{Place, PlaceAddress, PlaceDetails, PlaceKind};
pub use providers::{ProviderError, ProviderResult};
pub use storage::Storage;
pub use trip::{Document, DocumentStatus, Trip};
