use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{client_error, read_json, KnowledgeIndex, ProviderError, ProviderResult};
use crate::ingest::{ExtractionRequest, Extractor};
use crate::network::{join_url, ProviderClient};

const PROVIDER: &str = "openai";

const EXTRACTION_INSTRUCTIONS: &str = "You extract travel itinerary records from booking \
documents. Search the attached document store and return only a JSON array. Each element \
is an object with a \"type\" of flight, hotel, transfer, restaurant or activity plus the \
fields that apply to it. Common fields: title, description, confirmationNumber, \
clientArranged. flight: flightNumber, airline, departureAirport, arrivalAirport (IATA \
codes), departureTime, arrivalTime, departureTerminal, arrivalTerminal, seat, cabinClass. \
hotel: hotelName, address, city, state, country, checkInTime, checkOutTime, roomType, \
guestCount. transfer: companyName, contactName, contactPhone, vehicleType, \
pickupLocation, dropoffLocation, pickupTime, dropoffTime. restaurant: restaurantName, \
city, state, country, reservationTime, partySize, dietaryNotes. activity: activityName, \
operator, location, city, state, country, startTime, endTime. Write every time as local \
wall-clock time in the form YYYY-MM-DDTHH:MM without a timezone. Omit unknown fields.";

/// Shared OpenAI plumbing: bearer auth against one base URL.
#[derive(Clone)]
struct OpenAiApi {
    client: ProviderClient,
    api_key: String,
    base_url: String,
}

impl OpenAiApi {
    fn get(&self, path: &str) -> ProviderResult<reqwest::RequestBuilder> {
        Ok(self
            .client
            .get(&join_url(&self.base_url, path))
            .map_err(client_error(PROVIDER))?
            .bearer_auth(&self.api_key))
    }

    fn post(&self, path: &str) -> ProviderResult<reqwest::RequestBuilder> {
        Ok(self
            .client
            .post(&join_url(&self.base_url, path))
            .map_err(client_error(PROVIDER))?
            .bearer_auth(&self.api_key))
    }
}

/// One vector store per trip, holding the trip's uploaded documents.
pub struct OpenAiKnowledgeIndex {
    api: OpenAiApi,
}

impl OpenAiKnowledgeIndex {
    pub fn new(client: ProviderClient, api_key: String, base_url: String) -> Self {
        Self {
            api: OpenAiApi {
                client,
                api_key,
                base_url,
            },
        }
    }
}

#[derive(Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    data: Vec<ObjectId>,
    #[serde(default)]
    has_more: bool,
    last_id: Option<String>,
}

#[derive(Deserialize)]
struct FileObject {
    filename: String,
}

#[async_trait::async_trait]
impl KnowledgeIndex for OpenAiKnowledgeIndex {
    async fn create_index(&self, name: &str) -> ProviderResult<String> {
        let request = self.api.post("vector_stores")?.json(&json!({ "name": name }));
        let store: ObjectId = read_json(PROVIDER, request).await?;
        debug!(index_id = %store.id, name, "created vector store");
        Ok(store.id)
    }

    async fn list_file_names(&self, index_id: &str) -> ProviderResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .api
                .get(&format!("vector_stores/{index_id}/files"))?
                .query(&[("limit", "100")]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }

            let page: FileList = read_json(PROVIDER, request).await?;
            ids.extend(page.data.into_iter().map(|f| f.id));

            match (page.has_more, page.last_id) {
                (true, Some(last)) => after = Some(last),
                _ => break,
            }
        }

        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            let file: FileObject = read_json(PROVIDER, self.api.get(&format!("files/{id}"))?).await?;
            names.push(file.filename);
        }
        Ok(names)
    }

    async fn upload_file(&self, index_id: &str, file_name: &str, bytes: Vec<u8>) -> ProviderResult<()> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER,
                source: e,
            })?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let file: ObjectId = read_json(PROVIDER, self.api.post("files")?.multipart(form)).await?;

        let request = self
            .api
            .post(&format!("vector_stores/{index_id}/files"))?
            .json(&json!({ "file_id": file.id }));
        let _: ObjectId = read_json(PROVIDER, request).await?;

        debug!(index_id, file_name, file_id = %file.id, "uploaded document to vector store");
        Ok(())
    }
}

/// Extraction through the Responses API with `file_search` over the trip's store.
pub struct OpenAiExtractor {
    api: OpenAiApi,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(client: ProviderClient, api_key: String, base_url: String, model: String) -> Self {
        Self {
            api: OpenAiApi {
                client,
                api_key,
                base_url,
            },
            model,
        }
    }
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl ResponseBody {
    /// Concatenated `output_text` parts of the assistant message.
    fn output_text(&self) -> Option<String> {
        let text: String = self
            .output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text.as_deref())
            .collect();

        (!text.is_empty()).then_some(text)
    }
}

#[async_trait::async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> ProviderResult<String> {
        let body = json!({
            "model": self.model,
            "instructions": EXTRACTION_INSTRUCTIONS,
            "input": format!(
                "Extract every itinerary record from the document named \"{}\".",
                request.file_name
            ),
            "tools": [{
                "type": "file_search",
                "vector_store_ids": [request.index_id],
            }],
        });

        let response: ResponseBody =
            read_json(PROVIDER, self.api.post("responses")?.json(&body)).await?;

        response.output_text().ok_or(ProviderError::Decode {
            provider: PROVIDER,
            message: "response carried no output text".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_text_skips_tool_calls() {
        let raw = r#"{
            "id": "resp_1",
            "output": [
                {"type": "file_search_call", "id": "fs_1", "status": "completed"},
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        {"type": "output_text", "text": "[{\"type\": \"hotel\"", "annotations": []},
                        {"type": "output_text", "text": "}]", "annotations": []}
                    ]
                }
            ]
        }"#;

        let body: ResponseBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.output_text().as_deref(), Some(r#"[{"type": "hotel"}]"#));
    }

    #[test]
    fn test_output_text_absent() {
        let body: ResponseBody = serde_json::from_str(r#"{"output": []}"#).unwrap();
        assert!(body.output_text().is_none());
    }

    #[test]
    fn test_file_list_paging_fields() {
        let raw = r#"{"object": "list", "data": [{"id": "file-1"}], "has_more": true, "last_id": "file-1"}"#;
        let page: FileList = serde_json::from_str(raw).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.has_more);
        assert_eq!(page.last_id.as_deref(), Some("file-1"));
    }
}
