//! OpenAI embeddings, the primary model behind [`super::FallbackEmbedder`].

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{CoursebotError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Inputs per embeddings request.
const MAX_INPUTS_PER_REQUEST: usize = 100;

/// Embedding calls give up quickly so the hash fallback takes over.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn with_config(model: &str, dimensions: usize) -> Self {
        Self {
            client: create_client_with_timeout(REQUEST_TIMEOUT),
            model: model.to_string(),
            dimensions,
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self::with_config(&settings.model, settings.dimensions as usize)
    }

    /// One request's worth of texts, in input order.
    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(request_inputs(texts)))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| CoursebotError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| CoursebotError::OpenAI(format!("Embedding API error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// The endpoint rejects empty strings; blank texts are sent as a single space.
fn request_inputs(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .map(|t| if t.trim().is_empty() { " ".to_string() } else { t.clone() })
        .collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| CoursebotError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for group in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            vectors.extend(self.request(group).await?);
        }

        if vectors.len() != texts.len() {
            return Err(CoursebotError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
