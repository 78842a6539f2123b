use serde_json::Value;
use tracing::warn;

use super::draft::RawDraft;
use crate::item::{ActivityData, ItemDetails, ItemDraft};
use crate::providers::ProviderResult;

/// One document handed to the extraction collaborator.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// Knowledge index holding the trip's documents.
    pub index_id: &'a str,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// Black-box extraction: document in, raw model text out.
///
/// The text is expected to hold a JSON array of tagged records but is not
/// trusted; [`parse_extraction_output`] does the interpretation.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> ProviderResult<String>;
}

#[derive(Debug, Default)]
pub struct ParsedExtraction {
    pub records: Vec<RawDraft>,
    /// Records dropped for an unknown or missing type, or an unreadable shape.
    pub skipped: usize,
    /// Set when the output as a whole could not be read.
    pub failure: Option<String>,
}

/// Pulls the JSON payload out of model text, tolerating markdown fences and
/// prose around it.
pub fn strip_json_fences(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after = start + 3;
        let content_start = trimmed[after..]
            .find('\n')
            .map_or(after, |i| after + i + 1);
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end].trim();
        }
    }

    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let bounds = match (array, object) {
        (Some(a), Some(o)) => Some(if a.0 < o.0 { a } else { o }),
        (a, o) => a.or(o),
    };

    match bounds {
        Some((start, end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

pub fn parse_extraction_output(raw: &str) -> ParsedExtraction {
    let payload = strip_json_fences(raw);

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            return ParsedExtraction {
                failure: Some(format!("extraction output is not valid JSON: {e}")),
                ..Default::default()
            }
        }
    };

    let elements = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return ParsedExtraction {
                    failure: Some("extraction output has no item list".to_string()),
                    ..Default::default()
                }
            }
        },
        _ => {
            return ParsedExtraction {
                failure: Some("extraction output is neither a list nor an object".to_string()),
                ..Default::default()
            }
        }
    };

    let mut parsed = ParsedExtraction::default();
    for element in elements {
        match RawDraft::from_value(element) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                warn!(error = %e, "skipping extracted record");
                parsed.skipped += 1;
            }
        }
    }
    parsed
}

/// Stand-in item recorded when extraction output could not be read, so the
/// document surfaces for review instead of silently producing nothing.
pub fn placeholder_draft(file_name: &str, reason: &str) -> ItemDraft {
    let details = ItemDetails::Activity(ActivityData {
        activity_name: None,
        operator: None,
        location: None,
        extra: serde_json::json!({
            "extractionFailed": true,
            "reason": reason,
        }),
    });

    let mut draft = ItemDraft::new(format!("Review needed: {file_name}"), details);
    draft.description = Some(format!("Itinerary extraction failed: {reason}"));
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    #[test]
    fn test_strip_fenced_json() {
        let raw = "Here you go:\n```json\n[{\"type\": \"hotel\"}]\n```\nEnjoy!";
        assert_eq!(strip_json_fences(raw), "[{\"type\": \"hotel\"}]");

        let raw = "```\n{\"items\": []}\n```";
        assert_eq!(strip_json_fences(raw), "{\"items\": []}");
    }

    #[test]
    fn test_strip_bare_payload() {
        assert_eq!(
            strip_json_fences("The records: [{\"type\": \"flight\"}] done"),
            "[{\"type\": \"flight\"}]"
        );
        assert_eq!(strip_json_fences("{\"items\": [1]}"), "{\"items\": [1]}");
        assert_eq!(strip_json_fences("no json"), "no json");
    }

    #[test]
    fn test_parse_array_with_unknown_type() {
        let parsed = parse_extraction_output(
            r#"[{"type": "hotel", "hotelName": "Hotel Borg"}, {"type": "cruise"}, {"type": "flight"}]"#,
        );

        assert!(parsed.failure.is_none());
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.records[0].item_type(), ItemType::Hotel);
    }

    #[test]
    fn test_parse_items_object() {
        let parsed = parse_extraction_output(r#"{"items": [{"type": "activity"}]}"#);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn test_parse_failure() {
        let parsed = parse_extraction_output("I could not find any itinerary.");
        assert!(parsed.failure.is_some());
        assert!(parsed.records.is_empty());

        let parsed = parse_extraction_output(r#"{"trip": "Iceland"}"#);
        assert!(parsed.failure.is_some());
    }

    #[test]
    fn test_placeholder_draft() {
        let draft = placeholder_draft("iceland.pdf", "bad json");
        assert_eq!(draft.item_type(), ItemType::Activity);
        assert_eq!(draft.title, "Review needed: iceland.pdf");

        let ItemDetails::Activity(data) = &draft.details else {
            panic!("expected activity");
        };
        assert_eq!(data.extra["extractionFailed"], true);
    }
}
