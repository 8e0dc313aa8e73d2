use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::config::GeminiConfig;
use crate::models::{GroundingSource, RawResponse, TransportImagePart};

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Other: {0}")]
    Other(String),
}

/// One part of the request content, in the order it is sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl From<TransportImagePart> for RequestPart {
    fn from(part: TransportImagePart) -> Self {
        RequestPart::Inline {
            inline_data: InlineData {
                data: part.encoded_data,
                mime_type: part.mime_type,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub parts: Vec<RequestPart>,
    /// Let the model run live web searches before answering.
    pub search_grounding: bool,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = json!({
            "contents": [{ "parts": self.parts }],
            "generationConfig": { "temperature": self.temperature },
        });
        if self.search_grounding {
            // responseSchema cannot be combined with the googleSearch tool
            body["tools"] = json!([{ "googleSearch": {} }]);
        }
        body
    }
}

/// The remote generation endpoint.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<RawResponse, GeminiError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    async fn perform_api_call(&self, request: &GenerateRequest) -> Result<RawResponse, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let request_body = request.to_body();

        let mut loggable = request_body.clone();
        truncate_base64_in_json(&mut loggable);
        info!("📤 Request body: {}", serde_json::to_string_pretty(&loggable).unwrap_or_default());

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Status { status: status.as_u16(), body: error_body });
        }

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}", e)))?;

        let raw = parsed.into_raw_response();
        info!(
            "📥 Model answered with {} chars and {} grounding sources",
            raw.text.len(),
            raw.grounding_references.len()
        );
        Ok(raw)
    }

    fn demo_response(&self) -> RawResponse {
        let text = r#"Here is the comparison you asked for:
```json
{
  "productName": "Demo Wireless Earbuds (Black)",
  "brand": "Demo",
  "category": "Audio",
  "description": "Placeholder product returned in demo mode. Set GEMINI_API_KEY for live results.",
  "keyFeatures": ["Bluetooth 5.3", "40h battery", "IPX5"],
  "sellers": [
    {"name": "Amazon.in", "price": "₹1,499", "currency": "INR", "link": "", "inStock": true, "offers": "10% off with HDFC cards"},
    {"name": "Flipkart", "price": "1399", "currency": "INR", "link": "", "inStock": true, "offers": ""},
    {"name": "Croma", "price": "₹1,599", "currency": "INR", "link": "", "inStock": false, "offers": ""}
  ],
  "reviews": {
    "averageRating": 4.1,
    "totalReviews": "2,300+",
    "sentiment": "positive",
    "pros": ["Battery life", "Fit"],
    "cons": ["Average bass"],
    "summary": "Demo mode summary."
  }
}
```"#;
        RawResponse {
            text: text.to_string(),
            grounding_references: vec![GroundingSource {
                uri: "https://example.com/demo".to_string(),
                title: "Demo source".to_string(),
            }],
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(&self, request: &GenerateRequest) -> Result<RawResponse, GeminiError> {
        if self.is_demo() {
            info!("Using demo mode - returning canned product comparison");
            return Ok(self.demo_response());
        }
        info!("Generating grounded product search with Gemini API...");
        self.perform_api_call(request).await
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GeminiResponse {
    fn into_raw_response(self) -> RawResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            info!("⚠️ No candidates found in response structure");
            return RawResponse::default();
        };

        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text),
                Part::Other(_) => None,
            })
            .collect::<String>();

        let grounding_references = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .filter_map(|web| match web.uri {
                Some(uri) if !uri.trim().is_empty() => Some(GroundingSource {
                    uri,
                    title: web.title.unwrap_or_default(),
                }),
                _ => None,
            })
            .collect();

        RawResponse { text, grounding_references }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_body_puts_image_before_prompt_and_enables_search() {
        let request = GenerateRequest {
            parts: vec![
                TransportImagePart {
                    encoded_data: "aGVsbG8=".into(),
                    mime_type: "image/jpeg".into(),
                }
                .into(),
                RequestPart::Text { text: "find it".into() },
            ],
            search_grounding: true,
            temperature: 0.2,
        };

        let body = request.to_body();
        assert_eq!(
            body["contents"][0]["parts"],
            json!([
                { "inlineData": { "data": "aGVsbG8=", "mimeType": "image/jpeg" } },
                { "text": "find it" }
            ])
        );
        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
        assert!(body["generationConfig"].get("responseSchema").is_none());
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn request_body_without_grounding_has_no_tools() {
        let request = GenerateRequest {
            parts: vec![RequestPart::Text { text: "hi".into() }],
            search_grounding: false,
            temperature: 0.7,
        };
        assert!(request.to_body().get("tools").is_none());
    }

    #[test]
    fn response_text_and_sources_are_extracted() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"productName\":" }, { "text": "\"X\"}" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://www.amazon.in/x", "title": "amazon.in" } },
                        { "web": { "uri": "", "title": "empty" } },
                        { "web": { "title": "no uri" } },
                        { "retrievedContext": { "uri": "gs://bucket" } },
                        { "web": { "uri": "https://www.flipkart.com/y" } }
                    ]
                }
            }]
        });
        let parsed: GeminiResponse = serde_json::from_value(body).unwrap();
        let raw = parsed.into_raw_response();

        assert_eq!(raw.text, "{\"productName\":\"X\"}");
        assert_eq!(
            raw.grounding_references,
            vec![
                GroundingSource { uri: "https://www.amazon.in/x".into(), title: "amazon.in".into() },
                GroundingSource { uri: "https://www.flipkart.com/y".into(), title: String::new() },
            ]
        );
    }

    #[test]
    fn empty_candidates_give_empty_response() {
        let parsed: GeminiResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(parsed.into_raw_response(), RawResponse::default());
    }

    #[test]
    fn base64_payloads_are_truncated_for_logs() {
        let mut body = json!({ "parts": [{ "inlineData": { "data": "A".repeat(500), "mimeType": "image/jpeg" } }] });
        truncate_base64_in_json(&mut body);
        let data = body["parts"][0]["inlineData"]["data"].as_str().unwrap();
        assert!(data.ends_with("...[truncated 450 chars]"));
    }

    #[tokio::test]
    async fn demo_key_never_touches_the_network() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: DEMO_KEY.into(),
            base_url: "http://127.0.0.1:1".into(),
            model: "gemini-2.5-flash".into(),
        });
        let request = GenerateRequest {
            parts: vec![RequestPart::Text { text: "anything".into() }],
            search_grounding: true,
            temperature: 0.2,
        };
        let raw = client.generate_content(&request).await.unwrap();
        assert!(raw.text.contains("Demo Wireless Earbuds"));
        assert_eq!(raw.grounding_references.len(), 1);
    }
}
