use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Trip not found: {0}")]
    TripNotFound(uuid::Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    #[error("Place not found: {0}")]
    PlaceNotFound(uuid::Uuid),

    #[error("Invalid item type: {0}")]
    InvalidItemType(String),

    #[error("Invalid place kind: {0}")]
    InvalidPlaceKind(String),

    #[error("Invalid document status: {0}")]
    InvalidDocumentStatus(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Duplicate place: external id {0} already exists")]
    DuplicatePlace(String),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
