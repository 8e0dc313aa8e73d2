use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::gemini::{ContentGenerator, GeminiError, GenerateRequest, RequestPart};
use crate::models::{AnalysisRequest, AnalysisResult, TransportImagePart};
use crate::parser::{parse_product, ParseOutcome};
use crate::photo::{normalize_image, ImageError};
use crate::prompt::build_prompt;
use crate::retry::RetryPolicy;

/// Failures that end an analysis. Malformed model output is not one of them.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("image processing failed: {0}")]
    Image(#[from] ImageError),
    #[error("generation call failed: {0}")]
    Transport(#[from] GeminiError),
}

impl AnalyzeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalyzeError::Image(_) => "Failed to process the image. Please try a different photo.",
            AnalyzeError::Transport(_) => "Connection failed. Please check your internet.",
        }
    }
}

pub struct ProductAnalyzer {
    generator: Arc<dyn ContentGenerator>,
    retry: RetryPolicy,
    temperature: f32,
}

impl ProductAnalyzer {
    pub fn new(generator: Arc<dyn ContentGenerator>, temperature: f32) -> Self {
        Self { generator, retry: RetryPolicy::default(), temperature }
    }

    /// Photo and/or query in, product comparison out.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let mut parts = Vec::with_capacity(2);

        if let Some(image) = request.image.clone() {
            let part = prepare_image(image).await.map_err(|e| {
                error!("❌ Image processing failed: {}", e);
                e
            })?;
            parts.push(RequestPart::from(part));
        }

        let prompt = build_prompt(request.text_query.as_deref(), request.image.is_some());
        parts.push(RequestPart::Text { text: prompt });

        let generate = GenerateRequest {
            parts,
            search_grounding: true,
            temperature: self.temperature,
        };

        info!(
            "🚀 Analyzing product (query: {:?}, image: {})",
            request.text_query,
            request.image.is_some()
        );

        let response = self
            .retry
            .run(|| self.generator.generate_content(&generate))
            .await
            .map_err(|e| {
                error!("❌ Gemini API Error: {}", e);
                e
            })?;

        let (product_data, raw_text) = match parse_product(&response.text) {
            ParseOutcome::Parsed(product) => (Some(product), response.text),
            ParseOutcome::Unparsed { raw_text, reason } => {
                debug!(%reason, "Serving the answer as raw text");
                (None, raw_text)
            }
        };
        let raw_text = Some(raw_text).filter(|t| !t.is_empty());

        info!(
            "✅ Analysis finished (parsed: {}, sources: {})",
            product_data.is_some(),
            response.grounding_references.len()
        );

        Ok(AnalysisResult {
            product_data,
            sources: response.grounding_references,
            raw_text,
        })
    }
}

/// Image decoding and re-encoding is CPU bound, so it runs off the async workers.
async fn prepare_image(image: Bytes) -> Result<TransportImagePart, ImageError> {
    tokio::task::spawn_blocking(move || normalize_image(&image))
        .await
        .map_err(|e| ImageError::EncodeContext(format!("image worker unavailable: {e}")))?
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::RawResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Plays back scripted results and records every request it sees.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<RawResponse, GeminiError>>>,
        pub requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedGenerator {
        pub fn new(script: Vec<Result<RawResponse, GeminiError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::default(),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(RawResponse {
                text: text.to_string(),
                grounding_references: vec![],
            })])
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_content(&self, request: &GenerateRequest) -> Result<RawResponse, GeminiError> {
            self.requests.lock().push(request.clone());
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GeminiError::Other("script exhausted".into())))
        }
    }
}
