use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    /// Knowledge index created lazily on the first processed document.
    pub knowledge_index_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            knowledge_index_id: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl DocumentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Whether a batch run should pick this document up.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uploaded | Self::Failed, Self::Processing)
                | (Self::Processing, Self::Processed | Self::Failed)
        )
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            _ => Err(crate::Error::InvalidDocumentStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub status: DocumentStatus,
    pub raw_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    #[must_use]
    pub fn new(trip_id: Uuid, file_name: String, file_path: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            trip_id,
            file_name,
            file_path,
            status: DocumentStatus::Uploaded,
            raw_result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use DocumentStatus::{Failed, Processed, Processing, Uploaded};

        assert!(Uploaded.can_transition_to(Processing));
        assert!(Failed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Processed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Uploaded.can_transition_to(Processed));
        assert!(!Processed.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn test_eligible_statuses() {
        assert!(DocumentStatus::Uploaded.is_eligible());
        assert!(DocumentStatus::Failed.is_eligible());
        assert!(!DocumentStatus::Processing.is_eligible());
        assert!(!DocumentStatus::Processed.is_eligible());
    }

    #[test]
    fn test_new_document_is_uploaded() {
        let doc = Document::new(Uuid::now_v7(), "itinerary.pdf".into(), "/tmp/itinerary.pdf".into());
        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert!(doc.raw_result.is_none());
    }
}
