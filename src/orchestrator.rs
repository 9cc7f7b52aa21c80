//! Component wiring for coursebot.
//!
//! Builds the vector store, embedder, generator and prompts from [`Settings`] and
//! hands out the pipeline objects the commands need.

use crate::config::{EmbeddingProvider, Prompts, Settings};
use crate::embedding::{Embedder, FallbackEmbedder, OpenAIEmbedder};
use crate::error::{CoursebotError, Result};
use crate::generation::{Generator, OpenAIGenerator};
use crate::ingest::Ingestor;
use crate::openai::api_key_configured;
use crate::rag::{
    AnswerComposer, ConfidenceScorer, CourseAssistant, EscalationPolicy, ExtractiveComposer,
    GenerativeComposer, Retriever,
};
use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Owns the shared components of a coursebot process.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    generator: Option<Arc<dyn Generator>>,
}

impl Orchestrator {
    /// Build every component from settings.
    ///
    /// Without `OPENAI_API_KEY` the hash embedder is used and generation is disabled.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let vector_store = Self::build_vector_store(&settings)?;
        let has_key = api_key_configured();
        let dimensions = settings.embedding.dimensions as usize;

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
            EmbeddingProvider::OpenAI if has_key => {
                info!("Using OpenAI embeddings ({})", settings.embedding.model);
                Arc::new(FallbackEmbedder::new(Arc::new(OpenAIEmbedder::from_settings(
                    &settings.embedding,
                ))))
            }
            EmbeddingProvider::OpenAI => {
                warn!("OPENAI_API_KEY is not set; using hash embeddings");
                Arc::new(FallbackEmbedder::hash_only(dimensions))
            }
            EmbeddingProvider::Hash => {
                info!("Using hash embeddings ({} dimensions)", dimensions);
                Arc::new(FallbackEmbedder::hash_only(dimensions))
            }
        };

        let generator: Option<Arc<dyn Generator>> = if !settings.generation.enabled {
            info!("Generative answers disabled in settings");
            None
        } else if !has_key {
            warn!("OPENAI_API_KEY is not set; answers will be extractive");
            None
        } else {
            Some(Arc::new(OpenAIGenerator::with_config(
                &settings.generation.model,
                settings.generation.temperature,
                settings.generation.max_tokens,
            )))
        };

        Ok(Self {
            settings,
            prompts,
            embedder,
            vector_store,
            generator,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Self {
        Self {
            settings,
            prompts,
            embedder,
            vector_store,
            generator,
        }
    }

    fn build_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
        match settings.vector_store.provider.to_lowercase().as_str() {
            "sqlite" => {
                let path = settings.sqlite_path();
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Arc::new(SqliteVectorStore::new(&path)?))
            }
            "memory" => Ok(Arc::new(MemoryVectorStore::new())),
            other => Err(CoursebotError::Config(format!(
                "Unknown vector store provider: {}",
                other
            ))),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Whether a generator is available for generative answers.
    pub fn generation_available(&self) -> bool {
        self.generator.is_some()
    }

    /// A retriever configured from the retrieval settings.
    pub fn retriever(&self) -> Retriever {
        let retrieval = &self.settings.retrieval;
        Retriever::new(self.vector_store.clone(), self.embedder.clone())
            .with_min_relevance(retrieval.min_relevance)
            .with_fallback_score(retrieval.fallback_score)
            .with_prefer_title_matches(retrieval.prefer_title_matches)
    }

    /// An ingestor writing into the configured store.
    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(self.vector_store.clone(), self.embedder.clone())
            .with_window(self.settings.ingest.max_words, self.settings.ingest.overlap_words)
    }

    /// The question-answering pipeline. `generate` is ignored when no generator is
    /// available.
    pub fn assistant(&self, generate: bool) -> CourseAssistant {
        let composition = &self.settings.composition;
        let extractive = ExtractiveComposer::new(composition.max_extractive_sentences);

        let composer = match (&self.generator, generate) {
            (Some(generator), true) => {
                let generative = GenerativeComposer::new(generator.clone())
                    .with_prompts(self.prompts.clone())
                    .with_max_context_chars(composition.max_context_chars)
                    .with_timeout(Duration::from_secs(self.settings.generation.timeout_secs));
                AnswerComposer::with_primary(Arc::new(generative), extractive)
            }
            _ => AnswerComposer::extractive_only(extractive),
        };

        let top_k = self.settings.retrieval.top_k;
        CourseAssistant::new(Arc::new(self.retriever()), composer)
            .with_top_k(top_k)
            .with_scorer(ConfidenceScorer::new(self.settings.confidence.clone()))
            .with_escalation(EscalationPolicy::new(
                self.settings.escalation.confidence_threshold,
            ))
    }
}
